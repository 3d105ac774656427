use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connect(String),

    /// Query failed on the server. `code` is `-1` when the server reported a
    /// non-numeric code (which is then folded into the message).
    #[error("{message}")]
    Backend { message: String, code: Option<i32> },

    #[error("Trying to run query in rolled back transaction")]
    TransactionAborted,

    #[error("{0} without transaction")]
    NoOpenTransaction(&'static str),

    #[error("Trying to use iterator for the second time")]
    IteratorReused,

    #[error("Empty result set")]
    EmptyResultSet,

    /// The result has rows but the cursor is not positioned on one (the row
    /// was taken, or the rows were read to the end).
    #[error("No current row")]
    NoCurrentRow,

    #[error("Field '{0}' not found")]
    FieldNotFound(String),

    #[error("Return set contains more than one row ({0} rows)")]
    TooManyRows(usize),

    #[error("Field '{0}' cannot be used as a map key")]
    UnsupportedKey(String),

    #[error(transparent)]
    MalformedJson(#[from] serde_json::Error),

    #[error("Malformed interval: {0}")]
    MalformedInterval(String),

    #[error("Malformed array literal at offset {offset}: {reason}")]
    MalformedArrayLiteral { offset: usize, reason: &'static str },

    #[error("Malformed hstore: {0}")]
    MalformedHStore(String),

    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Malformed number: {0}")]
    MalformedNumber(String),
}

impl SessionError {
    /// Build a `Backend` error from the server's message and optional code.
    ///
    /// Numeric codes are kept as-is. Anything else (a SQLSTATE such as
    /// `23P01`) is prepended to the message and the code is reported as `-1`.
    pub fn backend(message: impl Into<String>, code: Option<&str>) -> Self {
        let message = message.into();
        match code {
            None => SessionError::Backend {
                message,
                code: None,
            },
            Some(code) => match code.trim().parse::<i32>() {
                Ok(code) => SessionError::Backend {
                    message,
                    code: Some(code),
                },
                Err(_) => SessionError::Backend {
                    message: format!("{code} {message}").trim().to_string(),
                    code: Some(-1),
                },
            },
        }
    }

    pub(crate) fn malformed_array(offset: usize, reason: &'static str) -> Self {
        SessionError::MalformedArrayLiteral { offset, reason }
    }
}
