//! Client-side session layer for PostgreSQL-style servers.
//!
//! Two pieces sit between application code and a wire-protocol driver:
//!
//! - a [`TransactionManager`](transaction::TransactionManager) that turns
//!   nested `begin`/`commit`/`rollback` calls into one real transaction plus
//!   savepoints, deferring each `BEGIN` until a statement actually needs it
//!   and running after-commit callbacks once the outermost level commits;
//! - a [`ResultCursor`](results::ResultCursor) that decodes the server's text
//!   format (arrays, hstore, json, intervals, timestamps, ...) into
//!   [`DbValue`](types::DbValue)s one row at a time.
//!
//! The driver itself is supplied through the [`Backend`](backend::Backend)
//! trait.
//!
//! ```rust
//! use pg_session::prelude::*;
//! use pg_session::test_utils::{MemoryResult, ScriptedBackend};
//!
//! let backend = ScriptedBackend::new().with_result(
//!     "select 1 as one",
//!     MemoryResult::new(vec![RawColumn::new("one", 23, "int4")]).row(&[Some("1")]),
//! );
//! let mut session = Session::new(backend, ConnectParams::default(), SessionOptions::default());
//!
//! session.begin().unwrap();
//! let row = session.exec_one("select 1 as one").unwrap().unwrap();
//! session.commit().unwrap();
//! assert_eq!(row["one"], DbValue::Int(1));
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod ordered_map;
pub mod prelude;
pub mod results;
pub mod session;
pub mod transaction;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::SessionError;
pub use session::Session;
pub use types::{DbValue, Row};
