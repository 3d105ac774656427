use std::sync::LazyLock;

use regex::Regex;

use super::array::unescape;
use crate::error::SessionError;
use crate::types::HStore;

static HSTORE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"((?:[^"\\]|\\.)*)"\s*=>\s*(?:"((?:[^"\\]|\\.)*)"|(NULL))"#)
        .expect("hstore pair pattern is valid")
});

/// Parse the text output of an hstore column (`"a"=>"1", "b"=>NULL`).
///
/// # Errors
/// Returns `SessionError::MalformedHStore` if anything other than commas and
/// whitespace sits between the matched pairs.
pub(crate) fn parse_hstore(raw: &str) -> Result<HStore, SessionError> {
    let mut map = HStore::new();
    let mut last_end = 0;

    for caps in HSTORE_PAIR.captures_iter(raw) {
        let Some(pair) = caps.get(0) else {
            continue;
        };
        check_separator(raw, last_end, pair.start())?;

        let key = caps.get(1).map_or("", |m| m.as_str());
        let value = if caps.get(3).is_some() {
            None
        } else {
            Some(unescape(caps.get(2).map_or("", |m| m.as_str())))
        };
        map.insert(unescape(key), value);
        last_end = pair.end();
    }

    check_separator(raw, last_end, raw.len())?;
    Ok(map)
}

fn check_separator(raw: &str, from: usize, to: usize) -> Result<(), SessionError> {
    let gap = &raw[from..to];
    if gap.chars().all(|c| c == ',' || c.is_whitespace()) {
        Ok(())
    } else {
        Err(SessionError::MalformedHStore(format!(
            "unexpected '{}' at offset {from}",
            gap.trim()
        )))
    }
}
