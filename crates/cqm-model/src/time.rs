//! Timestamp helpers shared by both schemas.
//!
//! The flat record stores instants as integer epoch seconds, while the typed
//! event list carries ISO 8601 strings (or CQL date structures when the values
//! come straight out of the event materializer). Everything funnels through
//! [`DateTime<FixedOffset>`] so the offset an event was recorded with survives
//! until it is flattened to epoch seconds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone};
use serde_json::{Map, Value};

/// Epoch seconds of `9999-12-31T23:59:59Z`, the open-ended interval sentinel.
///
/// The materializer fills missing interval ends with this instant. It never
/// denotes a real clinical time and is dropped wherever it is seen.
pub const OPEN_ENDED_EPOCH: i64 = 253_402_300_799;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a string that looks like an instant.
///
/// Returns `None` for anything that is not a complete date, so free text such
/// as codes or units never turns into a timestamp by accident.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    // Shortest accepted form is a bare YYYY-MM-DD.
    if trimmed.len() < 10 || !trimmed.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed);
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Instant for a count of epoch seconds.
pub fn from_epoch(seconds: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.fixed_offset())
}

/// Whole epoch seconds of an instant.
pub fn to_epoch(instant: &DateTime<FixedOffset>) -> i64 {
    instant.timestamp()
}

/// True when the instant is the open-ended sentinel.
pub fn is_open_ended(instant: &DateTime<FixedOffset>) -> bool {
    instant.timestamp() == OPEN_ENDED_EPOCH
}

/// Canonical event-side rendering: RFC 3339 with milliseconds.
pub fn format_timestamp(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// True when a JSON object has the shape of a CQL date structure.
pub fn is_date_structure(map: &Map<String, Value>) -> bool {
    map.contains_key("year") && map.contains_key("minute")
}

/// Convert a CQL date structure into an instant.
///
/// The structure is `{year, month, day, hour, minute, second, millisecond,
/// timezoneOffset}` where the offset is expressed in hours and may be a string.
pub fn parse_date_structure(map: &Map<String, Value>) -> Option<DateTime<FixedOffset>> {
    let field = |name: &str, default: i64| -> Option<i64> {
        match map.get(name) {
            None | Some(Value::Null) => Some(default),
            Some(value) => number_like(value).map(|n| n as i64),
        }
    };

    let year = i32::try_from(field("year", 0)?).ok()?;
    let month = u32::try_from(field("month", 1)?).ok()?;
    let day = u32::try_from(field("day", 1)?).ok()?;
    let hour = u32::try_from(field("hour", 0)?).ok()?;
    let minute = u32::try_from(field("minute", 0)?).ok()?;
    let second = u32::try_from(field("second", 0)?).ok()?;
    let millisecond = field("millisecond", 0)?;

    let offset_hours = match map.get("timezoneOffset") {
        None | Some(Value::Null) => 0.0,
        Some(value) => number_like(value)?,
    };
    let offset = FixedOffset::east_opt((offset_hours * 3600.0).round() as i32)?;

    let base = offset
        .with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()?;
    base.checked_add_signed(TimeDelta::try_milliseconds(millisecond)?)
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
