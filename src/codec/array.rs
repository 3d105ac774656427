use crate::error::SessionError;

/// Arrays deeper than this are rejected instead of recursing further.
const MAX_DEPTH: usize = 64;

/// One element of a parsed array literal, before type conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    /// `"..."` element, escapes already removed
    Quoted(String),
    /// Unquoted run of characters, surrounding whitespace trimmed
    Bare(String),
    /// Nested `{...}` sub-array
    Nested(Vec<ArrayElement>),
}

impl ArrayElement {
    /// Unquoted `NULL` (any case) is the server's null marker; a quoted
    /// `"NULL"` is the four-letter string.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ArrayElement::Bare(token) if token.eq_ignore_ascii_case("NULL"))
    }
}

/// Parse the server's text form of an array (`{1,2,{3,4}}`, `{"a","b\"c"}`, `{}`).
///
/// # Errors
/// Returns `SessionError::MalformedArrayLiteral` with the byte offset of the
/// problem for unbalanced braces, missing delimiters, unterminated quotes or
/// trailing characters.
pub fn parse_array(input: &str) -> Result<Vec<ArrayElement>, SessionError> {
    let bytes = input.as_bytes();
    let mut idx = skip_whitespace(bytes, 0);
    if bytes.get(idx) == Some(&b'[') {
        idx = skip_dimensions(bytes, idx)?;
    }
    if bytes.get(idx) != Some(&b'{') {
        return Err(SessionError::malformed_array(idx, "expected '{'"));
    }
    let (elements, end) = parse_level(input, idx + 1, 1)?;
    let end = skip_whitespace(bytes, end);
    if end != bytes.len() {
        return Err(SessionError::malformed_array(end, "trailing characters"));
    }
    Ok(elements)
}

/// Parse the elements following an opening brace at `start - 1`.
///
/// Returns the elements and the offset just past the matching `}` so the
/// caller can keep scanning its own siblings from there.
fn parse_level(
    input: &str,
    start: usize,
    depth: usize,
) -> Result<(Vec<ArrayElement>, usize), SessionError> {
    if depth > MAX_DEPTH {
        return Err(SessionError::malformed_array(start, "nesting too deep"));
    }
    let bytes = input.as_bytes();
    let mut elements = Vec::new();
    let mut idx = skip_whitespace(bytes, start);
    if bytes.get(idx) == Some(&b'}') {
        return Ok((elements, idx + 1));
    }

    loop {
        idx = skip_whitespace(bytes, idx);
        let (element, next) = match bytes.get(idx) {
            None => return Err(SessionError::malformed_array(idx, "unterminated array")),
            Some(b'{') => {
                let (inner, next) = parse_level(input, idx + 1, depth + 1)?;
                (ArrayElement::Nested(inner), next)
            }
            Some(b'"') => scan_quoted(input, idx)?,
            Some(b',' | b'}') => return Err(SessionError::malformed_array(idx, "missing element")),
            Some(_) => scan_bare(input, idx),
        };
        elements.push(element);

        idx = skip_whitespace(bytes, next);
        match bytes.get(idx) {
            Some(b',') => idx += 1,
            Some(b'}') => return Ok((elements, idx + 1)),
            None => return Err(SessionError::malformed_array(idx, "unterminated array")),
            Some(_) => return Err(SessionError::malformed_array(idx, "expected ',' or '}'")),
        }
    }
}

/// Scan a `"`-quoted element starting at the opening quote.
fn scan_quoted(input: &str, start: usize) -> Result<(ArrayElement, usize), SessionError> {
    let bytes = input.as_bytes();
    let mut out = String::new();
    let mut idx = start + 1;
    let mut segment = idx;

    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                out.push_str(&input[segment..idx]);
                let escaped = input[idx + 1..]
                    .chars()
                    .next()
                    .ok_or_else(|| SessionError::malformed_array(idx, "dangling escape"))?;
                out.push(escaped);
                idx += 1 + escaped.len_utf8();
                segment = idx;
            }
            b'"' => {
                out.push_str(&input[segment..idx]);
                return Ok((ArrayElement::Quoted(out), idx + 1));
            }
            _ => idx += 1,
        }
    }

    Err(SessionError::malformed_array(start, "unterminated quoted element"))
}

/// Scan an unquoted element: everything up to the next `,`, `{`, `}` or `"`.
fn scan_bare(input: &str, start: usize) -> (ArrayElement, usize) {
    let bytes = input.as_bytes();
    let mut idx = start;
    while idx < bytes.len() && !matches!(bytes[idx], b',' | b'{' | b'}' | b'"') {
        idx += 1;
    }
    (ArrayElement::Bare(input[start..idx].trim().to_string()), idx)
}

/// Skip a `[1:3][0:1]=` bounds prefix, returning the offset after `=`.
fn skip_dimensions(bytes: &[u8], start: usize) -> Result<usize, SessionError> {
    let mut idx = start;
    while idx < bytes.len() {
        match bytes[idx] {
            b'=' => return Ok(skip_whitespace(bytes, idx + 1)),
            b'[' | b']' | b':' | b'-' | b'0'..=b'9' => idx += 1,
            _ => break,
        }
    }
    Err(SessionError::malformed_array(idx, "bad dimension prefix"))
}

fn skip_whitespace(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

/// Remove backslash escapes: `\x` becomes `x`.
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(s: &str) -> ArrayElement {
        ArrayElement::Bare(s.to_string())
    }

    fn quoted(s: &str) -> ArrayElement {
        ArrayElement::Quoted(s.to_string())
    }

    #[test]
    fn empty_array() {
        assert_eq!(parse_array("{}").unwrap(), Vec::new());
    }

    #[test]
    fn flat_bare_elements() {
        assert_eq!(
            parse_array("{1,2,3}").unwrap(),
            vec![bare("1"), bare("2"), bare("3")]
        );
    }

    #[test]
    fn quoted_elements_are_unescaped() {
        assert_eq!(
            parse_array(r#"{"a,b","say \"hi\"","back\\slash",plain}"#).unwrap(),
            vec![
                quoted("a,b"),
                quoted(r#"say "hi""#),
                quoted(r"back\slash"),
                bare("plain")
            ]
        );
    }

    #[test]
    fn nested_arrays_resume_after_closing_brace() {
        assert_eq!(
            parse_array("{{1,2},{},{3}}").unwrap(),
            vec![
                ArrayElement::Nested(vec![bare("1"), bare("2")]),
                ArrayElement::Nested(vec![]),
                ArrayElement::Nested(vec![bare("3")]),
            ]
        );
    }

    #[test]
    fn multibyte_text_survives_escapes() {
        assert_eq!(
            parse_array(r#"{"żółw\"","日本"}"#).unwrap(),
            vec![quoted("żółw\""), quoted("日本")]
        );
    }

    #[test]
    fn dimension_prefix_is_skipped() {
        assert_eq!(
            parse_array("[0:1]={7,8}").unwrap(),
            vec![bare("7"), bare("8")]
        );
    }

    #[test]
    fn null_marker_is_only_unquoted() {
        let elements = parse_array(r#"{NULL,"NULL",null}"#).unwrap();
        assert!(elements[0].is_null());
        assert!(!elements[1].is_null());
        assert!(elements[2].is_null());
    }

    #[test]
    fn malformed_inputs_fail_with_offset() {
        for input in ["{1,2", "{1,,2}", "{\"abc}", "1,2}", "{1}x", "{{1}", "{1\"a\"}", ""] {
            let err = parse_array(input).unwrap_err();
            assert!(
                matches!(err, SessionError::MalformedArrayLiteral { .. }),
                "{input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let input = format!("{}{}", "{".repeat(100), "}".repeat(100));
        assert!(matches!(
            parse_array(&input),
            Err(SessionError::MalformedArrayLiteral { reason: "nesting too deep", .. })
        ));
    }
}
