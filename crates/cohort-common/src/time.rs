//! Timestamp parsing and interval arithmetic.
//!
//! Chart and admission times arrive as text (`2130-04-02 13:45:00`, with or
//! without a `T` separator, optional fractional seconds, or a bare date).
//! Everything is held as a naive local timestamp; source systems record a
//! single facility clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::{AnyValue, TimeUnit};

/// Canonical output format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp string.
///
/// Returns `None` for empty or unparseable input. A bare date resolves to
/// midnight.
///
/// # Examples
///
/// ```
/// use cohort_common::parse_timestamp;
///
/// assert!(parse_timestamp("2130-04-02 13:45:00").is_some());
/// assert!(parse_timestamp("2130-04-02T13:45").is_some());
/// assert!(parse_timestamp("2130-04-02").is_some());
/// assert!(parse_timestamp("").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Reads a timestamp out of a Polars cell: text or a timezone-naive datetime.
pub fn any_to_datetime(value: AnyValue<'_>) -> Option<NaiveDateTime> {
    match value {
        AnyValue::String(s) => parse_timestamp(s),
        AnyValue::StringOwned(s) => parse_timestamp(&s),
        AnyValue::Datetime(v, unit, _) | AnyValue::DatetimeOwned(v, unit, _) => {
            epoch_to_datetime(v, unit)
        }
        _ => None,
    }
}

fn epoch_to_datetime(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let (seconds, nanos) = match unit {
        TimeUnit::Milliseconds => (value.div_euclid(1_000), value.rem_euclid(1_000) * 1_000_000),
        TimeUnit::Microseconds => (
            value.div_euclid(1_000_000),
            value.rem_euclid(1_000_000) * 1_000,
        ),
        TimeUnit::Nanoseconds => (
            value.div_euclid(1_000_000_000),
            value.rem_euclid(1_000_000_000),
        ),
    };
    let nanos = u32::try_from(nanos).ok()?;
    DateTime::from_timestamp(seconds, nanos).map(|utc| utc.naive_utc())
}

/// Format a timestamp using [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}
