use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::SessionError;

const WITH_OFFSET: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const WITHOUT_OFFSET: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Seconds since the Unix epoch for a `date`, `timestamp` or `timestamptz`
/// value. Values without an offset are read as UTC.
///
/// # Errors
/// Returns `SessionError::MalformedTimestamp` for anything chrono cannot read
/// (including `infinity`).
pub(crate) fn parse_epoch_seconds(raw: &str) -> Result<i64, SessionError> {
    let value = raw.trim();

    for format in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.timestamp());
        }
    }
    for format in WITHOUT_OFFSET {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp());
    }

    Err(SessionError::MalformedTimestamp(raw.to_string()))
}

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC; `None` means now.
///
/// # Errors
/// Returns `SessionError::MalformedTimestamp` if the value is outside
/// chrono's representable range.
pub fn timestamp_literal(epoch_seconds: Option<i64>) -> Result<String, SessionError> {
    let moment = match epoch_seconds {
        Some(seconds) => DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| {
            SessionError::MalformedTimestamp(format!("{seconds} is out of range"))
        })?,
        None => Utc::now(),
    };
    Ok(moment.format("%Y-%m-%d %H:%M:%S").to_string())
}
