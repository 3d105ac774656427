use tracing::{debug, warn};

use crate::backend::StatementRunner;
use crate::error::SessionError;

/// Zero-argument hook run once after the outermost transaction commits.
pub type CommitCallback = Box<dyn FnOnce()>;

/// Where one logical transaction level stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// `begin` was called but nothing has been sent yet
    PendingBegin,
    /// `BEGIN` or `SAVEPOINT` has been issued for this level
    Open,
    /// This level has been rolled back; queries fail until it is popped
    RolledBack,
}

/// One logical transaction level on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionFrame {
    /// 1-based nesting depth of this level
    pub level: usize,
    /// Whether this level is pending, open or rolled back
    pub state: FrameState,
}

/// Nested transactions emulated with savepoints over one connection.
///
/// Logical depth counts `begin` calls not yet matched by `commit` or
/// `rollback`. Physical depth counts `BEGIN`/`SAVEPOINT`s actually sent.
/// Begins are deferred until a statement runs at that level, so physical
/// depth never exceeds logical depth, and only the innermost frame can still
/// be pending.
///
/// Every operation that may talk to the server takes the
/// [`StatementRunner`] to talk through; the manager itself holds no
/// connection.
#[derive(Default)]
pub struct TransactionManager {
    frames: Vec<TransactionFrame>,
    physical_depth: usize,
    callbacks: Vec<CommitCallback>,
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("frames", &self.frames)
            .field("physical_depth", &self.physical_depth)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

fn savepoint_name(physical_depth: usize) -> String {
    format!("level{physical_depth}begin")
}

impl TransactionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of transaction levels open on the server.
    #[must_use]
    pub fn physical_depth(&self) -> usize {
        self.physical_depth
    }

    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        !self.frames.is_empty()
    }

    #[must_use]
    pub fn is_in_physical_transaction(&self) -> bool {
        self.physical_depth > 0
    }

    #[must_use]
    pub fn current_frame(&self) -> Option<&TransactionFrame> {
        self.frames.last()
    }

    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// Open a new logical level.
    ///
    /// With `immediate` the level is opened on the server right away;
    /// otherwise that waits for the first statement run at this level. A
    /// still-pending parent is always opened first so savepoints nest in
    /// order. A level started inside a rolled-back level starts rolled back.
    ///
    /// # Errors
    /// Returns the backend error if a physical begin fails. A failed
    /// immediate begin leaves no new level behind.
    pub fn begin<R: StatementRunner>(
        &mut self,
        runner: &mut R,
        immediate: bool,
    ) -> Result<(), SessionError> {
        let parent = self.frames.last().map(|frame| frame.state);
        if parent == Some(FrameState::PendingBegin) {
            self.open_current(runner)?;
        }

        let level = self.frames.len() + 1;
        if parent == Some(FrameState::RolledBack) {
            self.frames.push(TransactionFrame {
                level,
                state: FrameState::RolledBack,
            });
            return Ok(());
        }

        self.frames.push(TransactionFrame {
            level,
            state: FrameState::PendingBegin,
        });
        if immediate {
            if let Err(err) = self.open_current(runner) {
                self.frames.pop();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Run a statement at the current level, opening it first if pending.
    ///
    /// If the statement fails while a physical transaction is open, that
    /// level is rolled back on the server before the error is returned and
    /// the current frame becomes `RolledBack`.
    ///
    /// # Errors
    /// `SessionError::TransactionAborted` if the current level was already
    /// rolled back; otherwise the backend's error.
    pub fn execute<R: StatementRunner>(
        &mut self,
        runner: &mut R,
        sql: &str,
    ) -> Result<R::Output, SessionError> {
        match self.frames.last().map(|frame| frame.state) {
            Some(FrameState::RolledBack) => return Err(SessionError::TransactionAborted),
            Some(FrameState::PendingBegin) => self.open_current(runner)?,
            Some(FrameState::Open) | None => {}
        }

        match runner.run(sql) {
            Ok(output) => Ok(output),
            Err(err) => {
                if self.physical_depth > 0 {
                    if let Err(rollback_err) = self.physical_rollback(runner) {
                        warn!(error = %rollback_err, "rollback after failed statement failed");
                    }
                    if let Some(frame) = self.frames.last_mut() {
                        frame.state = FrameState::RolledBack;
                    }
                }
                Err(err)
            }
        }
    }

    /// Close the current level successfully.
    ///
    /// Committing a rolled-back level just pops it. When the outermost level
    /// commits, queued callbacks run in registration order.
    ///
    /// # Errors
    /// `SessionError::NoOpenTransaction` at depth 0, or the backend's error
    /// if `COMMIT`/`RELEASE SAVEPOINT` fails (the level is popped anyway).
    pub fn commit<R: StatementRunner>(&mut self, runner: &mut R) -> Result<(), SessionError> {
        let frame = self
            .frames
            .pop()
            .ok_or(SessionError::NoOpenTransaction("Commit"))?;
        let outermost = self.frames.is_empty();

        let result = match frame.state {
            FrameState::RolledBack => {
                if outermost {
                    self.callbacks.clear();
                }
                return Ok(());
            }
            FrameState::PendingBegin => Ok(()),
            FrameState::Open => self.physical_commit(runner),
        };

        if let Err(err) = result {
            if outermost {
                self.callbacks.clear();
            }
            return Err(err);
        }
        if outermost {
            self.run_callbacks();
        }
        Ok(())
    }

    /// Roll back and pop the current level.
    ///
    /// Rolling back the outermost level discards queued callbacks; an inner
    /// rollback leaves them for the outer commit.
    ///
    /// # Errors
    /// `SessionError::NoOpenTransaction` at depth 0, or the backend's error
    /// if the physical rollback fails (the level is popped anyway).
    pub fn rollback<R: StatementRunner>(&mut self, runner: &mut R) -> Result<(), SessionError> {
        let frame = self
            .frames
            .pop()
            .ok_or(SessionError::NoOpenTransaction("Rollback"))?;
        if self.frames.is_empty() {
            self.callbacks.clear();
        }
        if frame.state == FrameState::Open {
            self.physical_rollback(runner)?;
        }
        Ok(())
    }

    /// Abandon every level: one `ROLLBACK` if anything is open on the server,
    /// then reset all state. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns the backend's error if the `ROLLBACK` itself fails; the
    /// manager is reset either way.
    pub fn global_rollback<R: StatementRunner>(
        &mut self,
        runner: &mut R,
    ) -> Result<(), SessionError> {
        let was_open = self.physical_depth > 0;
        self.frames.clear();
        self.physical_depth = 0;
        self.callbacks.clear();

        if was_open {
            debug!("ROLLBACK (global)");
            runner.run("ROLLBACK")?;
        }
        Ok(())
    }

    /// Queue a callback for after the outermost commit. Ignored (returns
    /// `false`) when no transaction is open.
    pub fn register_callback(&mut self, callback: impl FnOnce() + 'static) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        self.callbacks.push(Box::new(callback));
        true
    }

    fn open_current<R: StatementRunner>(&mut self, runner: &mut R) -> Result<(), SessionError> {
        let sql = if self.physical_depth == 0 {
            "BEGIN".to_string()
        } else {
            format!("SAVEPOINT {}", savepoint_name(self.physical_depth))
        };
        debug!(level = self.frames.len(), "{sql}");

        let state = match runner.run(&sql) {
            Ok(_) => {
                self.physical_depth += 1;
                FrameState::Open
            }
            Err(err) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.state = FrameState::RolledBack;
                }
                return Err(err);
            }
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.state = state;
        }
        Ok(())
    }

    fn physical_commit<R: StatementRunner>(&mut self, runner: &mut R) -> Result<(), SessionError> {
        self.physical_depth -= 1;
        let sql = if self.physical_depth == 0 {
            "COMMIT".to_string()
        } else {
            format!("RELEASE SAVEPOINT {}", savepoint_name(self.physical_depth))
        };
        debug!(level = self.frames.len() + 1, "{sql}");
        runner.run(&sql).map(|_| ())
    }

    fn physical_rollback<R: StatementRunner>(
        &mut self,
        runner: &mut R,
    ) -> Result<(), SessionError> {
        self.physical_depth -= 1;
        let sql = if self.physical_depth == 0 {
            "ROLLBACK".to_string()
        } else {
            format!("ROLLBACK TO SAVEPOINT {}", savepoint_name(self.physical_depth))
        };
        debug!(physical_depth = self.physical_depth, "{sql}");
        runner.run(&sql).map(|_| ())
    }

    fn run_callbacks(&mut self) {
        let callbacks = std::mem::take(&mut self.callbacks);
        if !callbacks.is_empty() {
            debug!(count = callbacks.len(), "running after-commit callbacks");
        }
        for callback in callbacks {
            callback();
        }
    }
}
