//! The seam between this crate and the driver that actually talks to the server.

use crate::config::ConnectParams;
use crate::error::SessionError;

/// Column metadata as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub type_id: u32,
    /// Catalog name if the driver knows it; may be empty.
    pub type_name: String,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, type_id: u32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id,
            type_name: type_name.into(),
        }
    }
}

/// One query's raw, text-format result.
///
/// Rows must be handed out in order; the supplier models a server-side
/// cursor with no rewind.
pub trait RawResult {
    fn row_count(&self) -> usize;

    fn columns(&self) -> &[RawColumn];

    /// Next row, values aligned with [`RawResult::columns`]; `None` at end of data.
    fn next_row(&mut self) -> Option<Vec<Option<String>>>;
}

/// Driver capability consumed by [`Session`](crate::session::Session).
///
/// Implementations own sockets, authentication and the wire protocol; this
/// crate only decides *which* statements to send and decodes what comes back.
pub trait Backend {
    type Connection;
    type Result: RawResult;

    /// Open a connection.
    ///
    /// # Errors
    /// Returns `SessionError::Connect` when the server cannot be reached or
    /// refuses the credentials.
    fn connect(&mut self, params: &ConnectParams) -> Result<Self::Connection, SessionError>;

    /// Run one SQL string.
    ///
    /// # Errors
    /// Returns `SessionError::Backend` carrying the server's message and code.
    fn run_query(
        &mut self,
        conn: &mut Self::Connection,
        sql: &str,
    ) -> Result<Self::Result, SessionError>;

    /// Last error text the server reported on this connection.
    fn last_error(&self, conn: &Self::Connection) -> String;

    fn close(&mut self, conn: Self::Connection);
}

/// Something that can run a statement on the session's single connection.
///
/// The transaction manager issues its `BEGIN`/`SAVEPOINT`/`COMMIT` traffic
/// through this, so it never needs to know how the connection is obtained.
pub trait StatementRunner {
    type Output;

    /// # Errors
    /// Returns whatever error the underlying connection reports.
    fn run(&mut self, sql: &str) -> Result<Self::Output, SessionError>;
}
