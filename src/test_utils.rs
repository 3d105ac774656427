//! In-memory backend for exercising sessions without a server.
//!
//! `ScriptedBackend` answers queries from a script of canned results and
//! failures and records every statement it sees. Clones share the same
//! script, so a test can hand one clone to a [`Session`](crate::session::Session)
//! and inspect the other.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::backend::{Backend, RawColumn, RawResult};
use crate::config::ConnectParams;
use crate::error::SessionError;

/// A fully buffered raw result.
#[derive(Debug, Clone, Default)]
pub struct MemoryResult {
    columns: Vec<RawColumn>,
    rows: VecDeque<Vec<Option<String>>>,
    row_count: usize,
}

impl MemoryResult {
    #[must_use]
    pub fn new(columns: Vec<RawColumn>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Append a row; `None` is SQL `NULL`.
    #[must_use]
    pub fn row(mut self, values: &[Option<&str>]) -> Self {
        self.rows
            .push_back(values.iter().map(|v| v.map(str::to_string)).collect());
        self.row_count += 1;
        self
    }
}

impl RawResult for MemoryResult {
    fn row_count(&self) -> usize {
        self.row_count
    }

    fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Vec<Option<String>>> {
        self.rows.pop_front()
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Rows(MemoryResult),
    Fail {
        message: String,
        code: Option<String>,
    },
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<String, Reply>,
    refuse_connections: bool,
    statements: Vec<String>,
    connects: usize,
    closes: usize,
    last_error: String,
}

/// Connection handle issued by [`ScriptedBackend`].
#[derive(Debug)]
pub struct MemoryConnection {
    pub id: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    script: Rc<RefCell<Script>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `result`. Unscripted statements get an empty result.
    #[must_use]
    pub fn with_result(self, sql: &str, result: MemoryResult) -> Self {
        self.script
            .borrow_mut()
            .replies
            .insert(sql.to_string(), Reply::Rows(result));
        self
    }

    /// Make `sql` fail with a server error carrying no code.
    #[must_use]
    pub fn failing(self, sql: &str, message: &str) -> Self {
        self.insert_failure(sql, message, None)
    }

    /// Make `sql` fail with a server error and code (numeric or SQLSTATE).
    #[must_use]
    pub fn failing_with_code(self, sql: &str, message: &str, code: &str) -> Self {
        self.insert_failure(sql, message, Some(code.to_string()))
    }

    #[must_use]
    pub fn refuse_connections(self) -> Self {
        self.script.borrow_mut().refuse_connections = true;
        self
    }

    /// Every statement run so far, transaction control included.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.script.borrow().statements.clone()
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.script.borrow().connects
    }

    #[must_use]
    pub fn close_count(&self) -> usize {
        self.script.borrow().closes
    }

    fn insert_failure(self, sql: &str, message: &str, code: Option<String>) -> Self {
        self.script.borrow_mut().replies.insert(
            sql.to_string(),
            Reply::Fail {
                message: message.to_string(),
                code,
            },
        );
        self
    }
}

impl Backend for ScriptedBackend {
    type Connection = MemoryConnection;
    type Result = MemoryResult;

    fn connect(&mut self, params: &ConnectParams) -> Result<Self::Connection, SessionError> {
        let mut script = self.script.borrow_mut();
        if script.refuse_connections {
            return Err(SessionError::Connect(format!(
                "connection to {}:{} refused",
                params.host.as_deref().unwrap_or("localhost"),
                params.port
            )));
        }
        script.connects += 1;
        Ok(MemoryConnection {
            id: script.connects,
        })
    }

    fn run_query(
        &mut self,
        _conn: &mut Self::Connection,
        sql: &str,
    ) -> Result<Self::Result, SessionError> {
        let mut script = self.script.borrow_mut();
        script.statements.push(sql.to_string());
        match script.replies.get(sql).cloned() {
            Some(Reply::Rows(result)) => Ok(result),
            Some(Reply::Fail { message, code }) => {
                script.last_error.clone_from(&message);
                Err(SessionError::backend(message, code.as_deref()))
            }
            None => Ok(MemoryResult::default()),
        }
    }

    fn last_error(&self, _conn: &Self::Connection) -> String {
        self.script.borrow().last_error.clone()
    }

    fn close(&mut self, _conn: Self::Connection) {
        self.script.borrow_mut().closes += 1;
    }
}
