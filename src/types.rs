use serde_json::Value as JsonValue;

use crate::ordered_map::OrderedMap;

/// One decoded result row: column name to value, in column order.
pub type Row = OrderedMap<DbValue>;

/// Decoded hstore value. `None` marks an SQL `NULL` value for that key.
pub type HStore = OrderedMap<Option<String>>;

/// Native value decoded from the server's text representation.
///
/// Composite variants nest freely, so an `_hstore` column decodes to an
/// `Array` of `HStore` values and a nested `int4[][]` to arrays of arrays:
/// ```rust
/// use pg_session::prelude::*;
///
/// let value = decode_value("_int4", Some("{{1,2},{3,NULL}}")).unwrap();
/// assert_eq!(
///     value,
///     DbValue::Array(vec![
///         DbValue::Array(vec![DbValue::Int(1), DbValue::Int(2)]),
///         DbValue::Array(vec![DbValue::Int(3), DbValue::Null]),
///     ])
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit); also epoch seconds for dates and whole intervals
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Array of values, possibly nested
    Array(Vec<DbValue>),
    /// Key/value map from an hstore column
    HStore(HStore),
    /// JSON document
    Json(JsonValue),
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let DbValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DbValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            DbValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DbValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let DbValue::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[DbValue]> {
        if let DbValue::Array(values) = self {
            Some(values)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_hstore(&self) -> Option<&HStore> {
        if let DbValue::HStore(map) = self {
            Some(map)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let DbValue::Json(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Text form of a scalar, used when a field becomes a map key.
    ///
    /// `Null` maps to the empty string; composite values have no key form.
    #[must_use]
    pub fn key_text(&self) -> Option<String> {
        match self {
            DbValue::Null => Some(String::new()),
            DbValue::Bool(b) => Some(if *b { "t" } else { "f" }.to_string()),
            DbValue::Int(i) => Some(i.to_string()),
            DbValue::Float(f) => Some(f.to_string()),
            DbValue::Text(s) => Some(s.clone()),
            DbValue::Array(_) | DbValue::HStore(_) | DbValue::Json(_) => None,
        }
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Float(value)
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl<T: Into<DbValue>> From<Vec<T>> for DbValue {
    fn from(values: Vec<T>) -> Self {
        DbValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// Type names as reported by the server catalog (`pg_type.typname`).
pub mod type_names {
    pub const BOOL: &str = "bool";
    pub const SMALLINT: &str = "int2";
    pub const INTEGER: &str = "int4";
    pub const BIGINT: &str = "int8";
    pub const NUMERIC: &str = "numeric";
    pub const REAL: &str = "float4";
    pub const DOUBLE: &str = "float8";
    pub const TEXT: &str = "text";
    pub const VARCHAR: &str = "varchar";
    pub const CHAR: &str = "bpchar";
    pub const JSON: &str = "json";
    pub const JSONB: &str = "jsonb";
    pub const HSTORE: &str = "hstore";
    pub const DATE: &str = "date";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TIMESTAMPTZ: &str = "timestamptz";
    pub const INTERVAL: &str = "interval";
    pub const BOOL_ARRAY: &str = "_bool";
    pub const SMALLINT_ARRAY: &str = "_int2";
    pub const INTEGER_ARRAY: &str = "_int4";
    pub const BIGINT_ARRAY: &str = "_int8";
    pub const NUMERIC_ARRAY: &str = "_numeric";
    pub const REAL_ARRAY: &str = "_float4";
    pub const DOUBLE_ARRAY: &str = "_float8";
    pub const TEXT_ARRAY: &str = "_text";
    pub const VARCHAR_ARRAY: &str = "_varchar";
    pub const CHAR_ARRAY: &str = "_char";
    pub const BPCHAR_ARRAY: &str = "_bpchar";
    pub const HSTORE_ARRAY: &str = "_hstore";
    pub const JSON_ARRAY: &str = "_json";
    pub const JSONB_ARRAY: &str = "_jsonb";
}
