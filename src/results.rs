//! Forward-only decoding over one query's raw result.

mod cursor;
mod rows;

pub use cursor::ResultCursor;
pub use rows::{IntoRows, Rows};

use crate::backend::RawColumn;
use crate::config::TypeRegistry;

/// A result column with its type name already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_id: u32,
    /// Name the decoder dispatches on; empty means pass-through text
    pub type_name: String,
}

impl ColumnDescriptor {
    pub(crate) fn resolve(raw: &RawColumn, types: &TypeRegistry) -> Self {
        Self {
            name: raw.name.clone(),
            type_id: raw.type_id,
            type_name: types.resolve(raw.type_id, &raw.type_name),
        }
    }
}
