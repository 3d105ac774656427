//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::backend::{Backend, RawColumn, RawResult, StatementRunner};
pub use crate::codec::{
    ArrayElement, array_literal, boolean_literal, decode_value, hstore_literal, parse_array,
    quote, timestamp_literal,
};
pub use crate::config::{
    ConnectParams, ConnectParamsBuilder, SessionOptions, SslMode, TypeRegistry,
};
pub use crate::error::SessionError;
pub use crate::ordered_map::OrderedMap;
pub use crate::results::{ColumnDescriptor, ResultCursor};
pub use crate::session::Session;
pub use crate::transaction::{FrameState, TransactionManager};
pub use crate::types::{DbValue, HStore, Row};
