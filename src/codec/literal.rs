//! Text helpers for callers that splice values into SQL.
//!
//! These produce SQL text only; nothing here talks to the server.

use serde_json::Value as JsonValue;

use crate::types::{DbValue, HStore};

/// Escape a string for use inside a single-quoted SQL literal.
///
/// Only `'` is doubled; backslashes and double quotes pass through, matching
/// a server running with `standard_conforming_strings = on`.
#[must_use]
pub fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render values as a quoted array literal, e.g. `'{"a","b"}'`.
///
/// Nested `DbValue::Array`s become nested braces, `Null` becomes a bare
/// `NULL`, every other element is double-quoted with `"` and `\`
/// backslash-escaped. The SQL quoting is applied once, around the whole
/// literal.
#[must_use]
pub fn array_literal(values: &[DbValue]) -> String {
    format!("'{}'", quote(&array_body(values)))
}

pub(crate) fn array_body(values: &[DbValue]) -> String {
    let elements: Vec<String> = values
        .iter()
        .map(|value| match value {
            DbValue::Array(inner) => array_body(inner),
            DbValue::Null => "NULL".to_string(),
            other => format!("\"{}\"", escape_element(&element_text(other))),
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

fn element_text(value: &DbValue) -> String {
    match value {
        DbValue::Null => String::new(),
        DbValue::Bool(b) => if *b { "t" } else { "f" }.to_string(),
        DbValue::Int(i) => i.to_string(),
        DbValue::Float(f) => f.to_string(),
        DbValue::Text(s) => s.clone(),
        DbValue::Array(inner) => array_body(inner),
        DbValue::HStore(map) => hstore_text(map),
        DbValue::Json(json) => json.to_string(),
    }
}

fn escape_element(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Text form of an hstore as the server prints it (`"a"=>"1", "b"=>NULL`).
pub(crate) fn hstore_text(map: &HStore) -> String {
    map.iter()
        .map(|(key, value)| match value {
            Some(value) => format!(
                "\"{}\"=>\"{}\"",
                escape_element(key),
                escape_element(value)
            ),
            None => format!("\"{}\"=>NULL", escape_element(key)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build an hstore SQL expression from a JSON object.
///
/// Each entry becomes `hstore('key', 'value')`, joined with `||`. Nested
/// objects are rendered recursively and cast to text. Anything that is not
/// a non-empty object yields the empty literal `''`.
/// ```rust
/// use pg_session::prelude::*;
/// use serde_json::json;
///
/// assert_eq!(
///     hstore_literal(&json!({"a": "it's", "n": 1})),
///     "hstore('a', 'it''s') || hstore('n', '1')"
/// );
/// ```
#[must_use]
pub fn hstore_literal(value: &JsonValue) -> String {
    let JsonValue::Object(map) = value else {
        return "''".to_string();
    };
    if map.is_empty() {
        return "''".to_string();
    }

    map.iter()
        .map(|(key, value)| {
            let rendered = match value {
                JsonValue::Object(_) => format!("({})::text", hstore_literal(value)),
                JsonValue::Null => "NULL::text".to_string(),
                JsonValue::String(s) => format!("'{}'", quote(s)),
                other => format!("'{}'", quote(&other.to_string())),
            };
            format!("hstore('{}', {rendered})", quote(key))
        })
        .collect::<Vec<_>>()
        .join(" || ")
}

/// Ternary boolean literal: `TRUE`, `FALSE` or `NULL`.
#[must_use]
pub fn boolean_literal(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "TRUE",
        Some(false) => "FALSE",
        None => "NULL",
    }
}
