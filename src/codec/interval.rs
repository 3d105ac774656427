use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::SessionError;
use crate::types::DbValue;

const SECONDS_PER_YEAR: i64 = 31_557_600;
const SECONDS_PER_MONTH: i64 = 2_592_000;
const SECONDS_PER_DAY: i64 = 86_400;

static INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<years>[+-]?\d+) years?\s*)?",
        r"(?:(?P<months>[+-]?\d+) mons?\s*)?",
        r"(?:(?P<days>[+-]?\d+) days?\s*)?",
        r"(?:(?P<clock_sign>[+-])?(?P<h>\d+):(?P<m>\d+):(?P<s>\d+)(?:\.(?P<frac>\d+))?)?$",
    ))
    .expect("interval pattern is valid")
});

/// Convert `postgres`-style interval output into total seconds.
///
/// Each of the year, month and day parts carries its own sign, and a sign
/// before the clock part applies to hours, minutes, seconds and fraction
/// together (`-1 days +02:00:00` is -79200). Whole results come back as
/// `Int`; a fractional-seconds part makes the result a `Float`.
///
/// # Errors
/// Returns `SessionError::MalformedInterval` if the text has no interval
/// parts or a component overflows.
pub(crate) fn parse_interval(raw: &str) -> Result<DbValue, SessionError> {
    let malformed = || SessionError::MalformedInterval(raw.to_string());

    let text = raw.trim();
    let caps = INTERVAL.captures(text).ok_or_else(malformed)?;
    let has_component = ["years", "months", "days", "h"]
        .iter()
        .any(|name| caps.name(name).is_some());
    if !has_component {
        return Err(malformed());
    }

    let mut calendar: i64 = 0;
    for (name, unit) in [
        ("years", SECONDS_PER_YEAR),
        ("months", SECONDS_PER_MONTH),
        ("days", SECONDS_PER_DAY),
    ] {
        calendar = component(&caps, name)?
            .checked_mul(unit)
            .and_then(|seconds| calendar.checked_add(seconds))
            .ok_or_else(malformed)?;
    }

    let mut clock: i64 = 0;
    for (name, unit) in [("h", 3600), ("m", 60), ("s", 1)] {
        clock = component(&caps, name)?
            .checked_mul(unit)
            .and_then(|seconds| clock.checked_add(seconds))
            .ok_or_else(malformed)?;
    }
    let clock_negative = caps
        .name("clock_sign")
        .is_some_and(|sign| sign.as_str() == "-");
    let total = if clock_negative {
        calendar.checked_sub(clock)
    } else {
        calendar.checked_add(clock)
    }
    .ok_or_else(malformed)?;

    match caps.name("frac") {
        Some(frac) => {
            let fraction: f64 = format!("0.{}", frac.as_str())
                .parse()
                .map_err(|_| malformed())?;
            #[allow(clippy::cast_precision_loss)]
            let seconds = total as f64;
            Ok(DbValue::Float(if clock_negative {
                seconds - fraction
            } else {
                seconds + fraction
            }))
        }
        None => Ok(DbValue::Int(total)),
    }
}

fn component(caps: &Captures<'_>, name: &str) -> Result<i64, SessionError> {
    caps.name(name).map_or(Ok(0), |m| {
        m.as_str()
            .parse()
            .map_err(|_| SessionError::MalformedInterval(format!("{name} out of range")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_and_hours() {
        assert_eq!(parse_interval("1 day 02:00:00").unwrap(), DbValue::Int(93_600));
    }

    #[test]
    fn every_component() {
        let expected = 2 * SECONDS_PER_YEAR + 3 * SECONDS_PER_MONTH + 4 * SECONDS_PER_DAY + 3723;
        assert_eq!(
            parse_interval("2 years 3 mons 4 days 01:02:03").unwrap(),
            DbValue::Int(expected)
        );
        assert_eq!(parse_interval("1 year 1 mon").unwrap(), DbValue::Int(34_149_600));
    }

    #[test]
    fn fractional_seconds_and_sign() {
        assert_eq!(parse_interval("00:00:01.5").unwrap(), DbValue::Float(1.5));
        assert_eq!(parse_interval("-00:01:00.25").unwrap(), DbValue::Float(-60.25));
        assert_eq!(parse_interval("-3 days").unwrap(), DbValue::Int(-259_200));
    }

    #[test]
    fn each_part_carries_its_own_sign() {
        assert_eq!(parse_interval("1 day -02:00:00").unwrap(), DbValue::Int(79_200));
        assert_eq!(parse_interval("-1 days +02:00:00").unwrap(), DbValue::Int(-79_200));
        assert_eq!(
            parse_interval("-1 years -2 mons").unwrap(),
            DbValue::Int(-SECONDS_PER_YEAR - 2 * SECONDS_PER_MONTH)
        );
        assert_eq!(
            parse_interval("1 year -1 mons +3 days -00:00:01.5").unwrap(),
            DbValue::Float((SECONDS_PER_YEAR - SECONDS_PER_MONTH + 3 * SECONDS_PER_DAY) as f64 - 1.5)
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for input in ["", "-", "soon", "1 fortnight", "12:00", "+", "1 day - 02:00:00"] {
            assert!(
                matches!(parse_interval(input), Err(SessionError::MalformedInterval(_))),
                "{input:?} should not parse"
            );
        }
    }
}
