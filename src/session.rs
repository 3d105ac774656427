use tracing::{debug, warn};

use crate::backend::{Backend, StatementRunner};
use crate::config::{ConnectParams, SessionOptions};
use crate::error::SessionError;
use crate::results::ResultCursor;
use crate::transaction::TransactionManager;
use crate::types::Row;

/// One logical database session over a single, lazily opened connection.
///
/// Statements go through the [`TransactionManager`], which decides whether a
/// deferred `BEGIN`/`SAVEPOINT` must be sent first. Results come back as
/// [`ResultCursor`]s that decode rows as they are read.
///
/// Dropping a session rolls back any transaction still open on the server
/// and closes the connection.
pub struct Session<B: Backend> {
    backend: B,
    params: ConnectParams,
    options: SessionOptions,
    conn: Option<B::Connection>,
    tx: TransactionManager,
}

/// Borrowed view of the connection half of a session, handed to the
/// transaction manager for each call.
struct Link<'a, B: Backend> {
    backend: &'a mut B,
    params: &'a ConnectParams,
    conn: &'a mut Option<B::Connection>,
}

impl<B: Backend> StatementRunner for Link<'_, B> {
    type Output = B::Result;

    fn run(&mut self, sql: &str) -> Result<B::Result, SessionError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                debug!(
                    host = self.params.host.as_deref().unwrap_or_default(),
                    port = self.params.port,
                    "opening connection"
                );
                self.backend.connect(self.params)?
            }
        };
        let conn = self.conn.insert(conn);
        self.backend.run_query(conn, sql)
    }
}

impl<B: Backend> Session<B> {
    /// Create a session. No connection is made until the first statement.
    pub fn new(backend: B, params: ConnectParams, options: SessionOptions) -> Self {
        Self {
            backend,
            params,
            options,
            conn: None,
            tx: TransactionManager::new(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Logical transaction depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tx.depth()
    }

    #[must_use]
    pub fn physical_depth(&self) -> usize {
        self.tx.physical_depth()
    }

    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.tx.is_in_transaction()
    }

    /// Last error text the server reported, if connected.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.conn
            .as_ref()
            .map(|conn| self.backend.last_error(conn))
    }

    /// Run a statement and return a cursor over its result.
    ///
    /// # Errors
    /// `SessionError::TransactionAborted` inside a rolled-back transaction;
    /// otherwise connection or backend errors. A failed statement inside a
    /// transaction rolls back the current level before returning.
    pub fn execute(&mut self, sql: &str) -> Result<ResultCursor<B::Result>, SessionError> {
        let mut link = Link {
            backend: &mut self.backend,
            params: &self.params,
            conn: &mut self.conn,
        };
        let raw = self.tx.execute(&mut link, sql)?;
        Ok(ResultCursor::new(raw, &self.options))
    }

    /// Run a statement expected to return at most one row.
    ///
    /// # Errors
    /// `SessionError::TooManyRows` when more than one row comes back, plus
    /// everything [`Session::execute`] can return.
    pub fn exec_one(&mut self, sql: &str) -> Result<Option<Row>, SessionError> {
        let mut cursor = self.execute(sql)?;
        match cursor.row_count() {
            0 => Ok(None),
            1 => cursor.next_row(),
            n => Err(SessionError::TooManyRows(n)),
        }
    }

    /// Open a transaction level; nothing is sent until the next statement.
    ///
    /// # Errors
    /// Backend errors if a pending outer level has to be opened first.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        self.begin_with(false)
    }

    /// Open a transaction level and send its `BEGIN`/`SAVEPOINT` right away.
    ///
    /// # Errors
    /// Connection or backend errors; the level is not opened on failure.
    pub fn begin_immediate(&mut self) -> Result<(), SessionError> {
        self.begin_with(true)
    }

    /// # Errors
    /// `SessionError::NoOpenTransaction` outside a transaction, or the
    /// backend's error.
    pub fn commit(&mut self) -> Result<(), SessionError> {
        let mut link = Link {
            backend: &mut self.backend,
            params: &self.params,
            conn: &mut self.conn,
        };
        self.tx.commit(&mut link)
    }

    /// # Errors
    /// `SessionError::NoOpenTransaction` outside a transaction, or the
    /// backend's error.
    pub fn rollback(&mut self) -> Result<(), SessionError> {
        let mut link = Link {
            backend: &mut self.backend,
            params: &self.params,
            conn: &mut self.conn,
        };
        self.tx.rollback(&mut link)
    }

    /// Roll back every open level at once.
    ///
    /// # Errors
    /// The backend's error if `ROLLBACK` fails; state is reset regardless.
    pub fn global_rollback(&mut self) -> Result<(), SessionError> {
        let mut link = Link {
            backend: &mut self.backend,
            params: &self.params,
            conn: &mut self.conn,
        };
        self.tx.global_rollback(&mut link)
    }

    /// Run `callback` once the outermost transaction commits. Returns `false`
    /// (and drops the callback) when no transaction is open.
    pub fn register_after_commit(&mut self, callback: impl FnOnce() + 'static) -> bool {
        self.tx.register_callback(callback)
    }

    /// Run `body` in its own transaction level: commit on `Ok`, roll back on
    /// `Err`.
    ///
    /// # Errors
    /// The body's error, or the commit's if the body succeeded.
    pub fn transaction<T, F>(&mut self, body: F) -> Result<T, SessionError>
    where
        F: FnOnce(&mut Self) -> Result<T, SessionError>,
    {
        self.begin()?;
        match body(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!(error = %rollback_err, "rollback after failed transaction body failed");
                }
                Err(err)
            }
        }
    }

    /// Roll back anything open and close the connection. The session can be
    /// used again; the next statement reconnects.
    ///
    /// # Errors
    /// The backend's error if the rollback fails; the connection is closed
    /// regardless.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        let result = self.global_rollback();
        if let Some(conn) = self.conn.take() {
            debug!("closing connection");
            self.backend.close(conn);
        }
        result
    }

    fn begin_with(&mut self, immediate: bool) -> Result<(), SessionError> {
        let mut link = Link {
            backend: &mut self.backend,
            params: &self.params,
            conn: &mut self.conn,
        };
        self.tx.begin(&mut link, immediate)
    }
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(error = %err, "rollback on session drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedBackend;

    fn session(backend: &ScriptedBackend) -> Session<ScriptedBackend> {
        Session::new(
            backend.clone(),
            ConnectParams::builder().host("db").finish(),
            SessionOptions::default(),
        )
    }

    #[test]
    fn connects_lazily_once() {
        let backend = ScriptedBackend::new();
        let mut session = session(&backend);
        session.begin().unwrap();
        assert!(!session.is_connected());
        session.execute("select 1").unwrap();
        session.execute("select 2").unwrap();
        assert_eq!(backend.connect_count(), 1);
        session.commit().unwrap();
        assert_eq!(backend.statements(), vec!["BEGIN", "select 1", "select 2", "COMMIT"]);
    }

    #[test]
    fn refused_connection_surfaces_connect_error() {
        let backend = ScriptedBackend::new().refuse_connections();
        let mut session = session(&backend);
        assert!(matches!(
            session.execute("select 1"),
            Err(SessionError::Connect(_))
        ));
        assert!(!session.is_connected());
    }

    #[test]
    fn disconnect_rolls_back_and_closes() {
        let backend = ScriptedBackend::new();
        let mut session = session(&backend);
        session.begin_immediate().unwrap();
        session.disconnect().unwrap();
        assert_eq!(backend.statements(), vec!["BEGIN", "ROLLBACK"]);
        assert_eq!(backend.close_count(), 1);
        assert_eq!(session.depth(), 0);

        session.execute("select 1").unwrap();
        assert_eq!(backend.connect_count(), 2);
    }
}
