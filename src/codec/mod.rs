mod array;
mod hstore;
mod interval;
mod literal;
mod timestamp;

pub use array::{ArrayElement, parse_array};
pub use literal::{array_literal, boolean_literal, hstore_literal, quote};
pub use timestamp::timestamp_literal;

use crate::error::SessionError;
use crate::types::{DbValue, type_names as tn};

type ElementDecoder = fn(&str) -> Result<DbValue, SessionError>;

/// Decode one raw text value according to its column's type name.
///
/// `None` (SQL `NULL`) always decodes to `DbValue::Null` before any type rule
/// is consulted. Unknown type names pass the text through unchanged.
/// ```rust
/// use pg_session::prelude::*;
///
/// assert_eq!(decode_value("bool", Some("t")).unwrap(), DbValue::Bool(true));
/// assert_eq!(decode_value("interval", Some("1 day 02:00:00")).unwrap(), DbValue::Int(93_600));
/// assert_eq!(decode_value("int4", None).unwrap(), DbValue::Null);
/// assert_eq!(decode_value("inet", Some("::1")).unwrap(), DbValue::Text("::1".into()));
/// ```
///
/// # Errors
/// Returns the `Malformed*` error matching the type when the text cannot be
/// parsed.
pub fn decode_value(type_name: &str, raw: Option<&str>) -> Result<DbValue, SessionError> {
    let Some(raw) = raw else {
        return Ok(DbValue::Null);
    };

    match type_name {
        tn::BOOL => Ok(decode_bool(raw)),
        tn::SMALLINT | tn::INTEGER | tn::BIGINT => decode_int(raw),
        tn::NUMERIC | tn::REAL | tn::DOUBLE => decode_float(raw),
        tn::JSON | tn::JSONB => decode_json(raw),
        tn::HSTORE => decode_hstore(raw),
        tn::DATE | tn::TIMESTAMP | tn::TIMESTAMPTZ => {
            timestamp::parse_epoch_seconds(raw).map(DbValue::Int)
        }
        tn::INTERVAL => interval::parse_interval(raw),
        tn::BOOL_ARRAY => decode_array(raw, |s| Ok(decode_bool(s))),
        tn::SMALLINT_ARRAY | tn::INTEGER_ARRAY | tn::BIGINT_ARRAY => decode_array(raw, decode_int),
        tn::NUMERIC_ARRAY | tn::REAL_ARRAY | tn::DOUBLE_ARRAY => decode_array(raw, decode_float),
        tn::TEXT_ARRAY | tn::VARCHAR_ARRAY | tn::CHAR_ARRAY | tn::BPCHAR_ARRAY => {
            decode_array(raw, |s| Ok(DbValue::Text(s.to_string())))
        }
        tn::HSTORE_ARRAY => decode_array(raw, decode_hstore),
        tn::JSON_ARRAY | tn::JSONB_ARRAY => decode_array(raw, decode_json),
        _ => Ok(DbValue::Text(raw.to_string())),
    }
}

fn decode_bool(raw: &str) -> DbValue {
    DbValue::Bool(raw == "t")
}

fn decode_int(raw: &str) -> Result<DbValue, SessionError> {
    raw.trim()
        .parse::<i64>()
        .map(DbValue::Int)
        .map_err(|e| SessionError::MalformedNumber(format!("{raw}: {e}")))
}

fn decode_float(raw: &str) -> Result<DbValue, SessionError> {
    raw.trim()
        .parse::<f64>()
        .map(DbValue::Float)
        .map_err(|e| SessionError::MalformedNumber(format!("{raw}: {e}")))
}

fn decode_json(raw: &str) -> Result<DbValue, SessionError> {
    Ok(DbValue::Json(serde_json::from_str(raw)?))
}

fn decode_hstore(raw: &str) -> Result<DbValue, SessionError> {
    hstore::parse_hstore(raw).map(DbValue::HStore)
}

fn decode_array(raw: &str, element: ElementDecoder) -> Result<DbValue, SessionError> {
    let elements = parse_array(raw)?;
    convert_elements(elements, element).map(DbValue::Array)
}

fn convert_elements(
    elements: Vec<ArrayElement>,
    element: ElementDecoder,
) -> Result<Vec<DbValue>, SessionError> {
    elements
        .into_iter()
        .map(|item| {
            if item.is_null() {
                return Ok(DbValue::Null);
            }
            match item {
                ArrayElement::Nested(inner) => convert_elements(inner, element).map(DbValue::Array),
                ArrayElement::Quoted(text) | ArrayElement::Bare(text) => element(&text),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ints(values: &[Option<i64>]) -> DbValue {
        DbValue::Array(values.iter().map(|v| DbValue::from(*v)).collect())
    }

    #[test]
    fn integer_arrays() {
        assert_eq!(
            decode_value("_int4", Some("{1,2,3,4,5,6}")).unwrap(),
            ints(&[Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)])
        );
        assert_eq!(decode_value("_int4", Some("{}")).unwrap(), DbValue::Array(vec![]));
        assert_eq!(decode_value("_int4", None).unwrap(), DbValue::Null);
        assert_eq!(
            decode_value("_int8", Some("{null,null,3,4,null,6}")).unwrap(),
            ints(&[None, None, Some(3), Some(4), None, Some(6)])
        );
    }

    #[test]
    fn numeric_array_elements_are_floats() {
        assert_eq!(
            decode_value("_numeric", Some("{1.5,NULL,-2}")).unwrap(),
            DbValue::Array(vec![DbValue::Float(1.5), DbValue::Null, DbValue::Float(-2.0)])
        );
    }

    #[test]
    fn text_arrays_keep_quoted_null_string() {
        assert_eq!(
            decode_value("_text", Some(r#"{"NULL",NULL,"a\"b",plain}"#)).unwrap(),
            DbValue::Array(vec![
                DbValue::Text("NULL".into()),
                DbValue::Null,
                DbValue::Text("a\"b".into()),
                DbValue::Text("plain".into()),
            ])
        );
    }

    #[test]
    fn hstore_and_json_arrays_decode_each_element() {
        let hstores = decode_value("_hstore", Some(r#"{"\"a\"=>\"1\"","\"b\"=>NULL"}"#)).unwrap();
        let items = hstores.as_array().unwrap();
        assert_eq!(items[0].as_hstore().unwrap()["a"].as_deref(), Some("1"));
        assert_eq!(items[1].as_hstore().unwrap()["b"], None);

        let docs = decode_value("_json", Some(r#"{"{\"k\": 1}","[1,2]"}"#)).unwrap();
        assert_eq!(
            docs,
            DbValue::Array(vec![DbValue::Json(json!({"k": 1})), DbValue::Json(json!([1, 2]))])
        );
    }

    #[test]
    fn scalars() {
        assert_eq!(decode_value("bool", Some("f")).unwrap(), DbValue::Bool(false));
        assert_eq!(decode_value("bool", Some("yes")).unwrap(), DbValue::Bool(false));
        assert_eq!(decode_value("int8", Some("-42")).unwrap(), DbValue::Int(-42));
        assert_eq!(decode_value("numeric", Some("3.25")).unwrap(), DbValue::Float(3.25));
        assert_eq!(
            decode_value("timestamptz", Some("2015-04-22 19:33:39+03")).unwrap(),
            DbValue::Int(1_429_720_419)
        );
        assert_eq!(
            decode_value("json", Some(r#"{"a":"1", "b":"3"}"#)).unwrap(),
            DbValue::Json(json!({"a": "1", "b": "3"}))
        );
    }

    #[test]
    fn hstore_fixture() {
        let value = decode_value(
            "hstore",
            Some(r#""a"=>"123", "b"=>"32'1", "c'"=>"another string""#),
        )
        .unwrap();
        let map = value.as_hstore().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c'"]);
        assert_eq!(map["a"].as_deref(), Some("123"));
        assert_eq!(map["b"].as_deref(), Some("32'1"));
        assert_eq!(map["c'"].as_deref(), Some("another string"));
    }

    #[test]
    fn hstore_text_decodes_back_to_same_map() {
        let map: crate::types::HStore = [
            ("plain", Some("value".to_string())),
            ("say \"hi\"", Some("c:\\dir\\".to_string())),
            ("empty", Some(String::new())),
            ("gone", None),
            ("arrow=>key", Some("a,b".to_string())),
        ]
        .into_iter()
        .collect();
        let text = literal::hstore_text(&map);
        assert_eq!(decode_value("hstore", Some(text.as_str())).unwrap(), DbValue::HStore(map));
    }

    #[test]
    fn interval_with_fraction_decodes_to_float_seconds() {
        assert_eq!(
            decode_value("interval", Some("1 day 02:00:00.5")).unwrap(),
            DbValue::Float(93_600.5)
        );
        assert_eq!(
            decode_value("interval", Some("1 day -02:00:00.25")).unwrap(),
            DbValue::Float(79_199.75)
        );
    }

    #[test]
    fn null_wins_over_type_rules() {
        for type_name in ["bool", "json", "hstore", "interval", "_text", "mystery"] {
            assert_eq!(decode_value(type_name, None).unwrap(), DbValue::Null);
        }
    }

    #[test]
    fn decode_errors_are_typed() {
        assert!(matches!(
            decode_value("json", Some("{nope")),
            Err(SessionError::MalformedJson(_))
        ));
        assert!(matches!(
            decode_value("int4", Some("12a")),
            Err(SessionError::MalformedNumber(_))
        ));
        assert!(matches!(
            decode_value("_int4", Some("{1,2")),
            Err(SessionError::MalformedArrayLiteral { .. })
        ));
        assert!(matches!(
            decode_value("interval", Some("later")),
            Err(SessionError::MalformedInterval(_))
        ));
    }
}
