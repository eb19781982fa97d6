//! Timestamp parsing shared by ingestion and filter bounds.

use crate::domain::Decimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Epoch values at or above this magnitude are milliseconds, below it seconds.
///
/// 1e11 seconds is in the year 5138; 1e11 milliseconds is March 1973.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("unparsable timestamp: {0}")]
    Unparsable(String),
    #[error("epoch value out of range: {0}")]
    OutOfRange(String),
}

/// What a date/time string turned out to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedInstant {
    /// Carried an explicit offset (or was an epoch value).
    Aware(DateTime<Utc>),
    /// Date and time without any zone information.
    Naive(NaiveDateTime),
    /// Calendar date only.
    Date(NaiveDate),
}

impl ParsedInstant {
    /// Resolve to an instant, reading naive values as UTC.
    pub fn assume_utc(self) -> DateTime<Utc> {
        match self {
            ParsedInstant::Aware(dt) => dt,
            ParsedInstant::Naive(naive) => Utc.from_utc_datetime(&naive),
            ParsedInstant::Date(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        }
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%m/%d/%Y"];

/// Parse a calendar date/time string, reporting whether it carried a zone.
pub fn parse_datetime_str(raw: &str) -> Result<ParsedInstant, TimestampError> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(ParsedInstant::Aware(dt.with_timezone(&Utc)));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(ParsedInstant::Aware(dt.with_timezone(&Utc)));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ParsedInstant::Naive(naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(ParsedInstant::Date(date));
        }
    }

    Err(TimestampError::Unparsable(s.to_string()))
}

/// Convert a Unix epoch value in seconds or milliseconds to an instant.
///
/// Fractional values keep their sub-second part.
pub fn from_epoch(value: Decimal) -> Result<DateTime<Utc>, TimestampError> {
    let is_millis = value.abs() >= Decimal::from(EPOCH_MILLIS_THRESHOLD);
    let nanos_per_unit = if is_millis {
        Decimal::from(1_000_000)
    } else {
        Decimal::from(1_000_000_000)
    };

    let total_nanos = value
        .checked_mul(nanos_per_unit)
        .ok_or_else(|| TimestampError::OutOfRange(value.to_string()))?
        .inner()
        .trunc()
        .to_i128()
        .ok_or_else(|| TimestampError::OutOfRange(value.to_string()))?;

    let secs = total_nanos.div_euclid(1_000_000_000);
    let nanos = total_nanos.rem_euclid(1_000_000_000) as u32;
    let secs = i64::try_from(secs).map_err(|_| TimestampError::OutOfRange(value.to_string()))?;

    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| TimestampError::OutOfRange(value.to_string()))
}

/// Parse a raw timestamp cell: an epoch number, a numeric string, or a date string.
///
/// Strings without a zone are read as UTC.
pub fn parse_timestamp_value(value: &serde_json::Value) -> Result<DateTime<Utc>, TimestampError> {
    match value {
        serde_json::Value::Number(n) => {
            let d = Decimal::from_json_number(n)
                .map_err(|_| TimestampError::Unparsable(n.to_string()))?;
            from_epoch(d)
        }
        serde_json::Value::String(s) => match Decimal::from_str_canonical(s) {
            Ok(d) => from_epoch(d),
            Err(_) => parse_datetime_str(s).map(ParsedInstant::assume_utc),
        },
        other => Err(TimestampError::Unparsable(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_epoch_seconds_and_millis_agree() {
        let secs = parse_timestamp_value(&json!(1_700_000_000)).unwrap();
        let millis = parse_timestamp_value(&json!(1_700_000_000_000_i64)).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs, utc(2023, 11, 14, 22, 13, 20));
    }

    #[test]
    fn test_fractional_epoch_keeps_subseconds() {
        let t = parse_timestamp_value(&json!(1_700_000_000.25)).unwrap();
        assert_eq!(t.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_numeric_string_is_epoch() {
        let t = parse_timestamp_value(&json!("1700000000")).unwrap();
        assert_eq!(t, utc(2023, 11, 14, 22, 13, 20));
    }

    #[test]
    fn test_naive_string_is_utc() {
        let t = parse_timestamp_value(&json!("2024-03-01 12:30:00")).unwrap();
        assert_eq!(t, utc(2024, 3, 1, 12, 30, 0));
        let t = parse_timestamp_value(&json!("2024-03-01T12:30:00")).unwrap();
        assert_eq!(t, utc(2024, 3, 1, 12, 30, 0));
    }

    #[test]
    fn test_offset_string_is_converted() {
        let t = parse_timestamp_value(&json!("2024-03-01T12:30:00+02:00")).unwrap();
        assert_eq!(t, utc(2024, 3, 1, 10, 30, 0));
        let t = parse_timestamp_value(&json!("2024-03-01T12:30:00Z")).unwrap();
        assert_eq!(t, utc(2024, 3, 1, 12, 30, 0));
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let t = parse_timestamp_value(&json!("2024-03-01")).unwrap();
        assert_eq!(t, utc(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_reports_naive_vs_aware() {
        assert!(matches!(
            parse_datetime_str("2024-03-01 12:00:00"),
            Ok(ParsedInstant::Naive(_))
        ));
        assert!(matches!(
            parse_datetime_str("2024-03-01T12:00:00+00:00"),
            Ok(ParsedInstant::Aware(_))
        ));
        assert!(matches!(parse_datetime_str("03/01/2024"), Ok(ParsedInstant::Date(_))));
    }

    #[test]
    fn test_huge_epoch_is_out_of_range() {
        for raw in [json!("10000000000000000000000000"), json!(1e25), json!("-79228162514264337593543950335")] {
            assert!(
                matches!(parse_timestamp_value(&raw), Err(TimestampError::OutOfRange(_))),
                "expected out of range for {}",
                raw
            );
        }
        // Fits in a Decimal after scaling but not in chrono's range.
        assert!(matches!(
            parse_timestamp_value(&json!("900000000000000000")),
            Err(TimestampError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_timestamp_value(&json!("yesterday")).is_err());
        assert!(parse_timestamp_value(&json!(true)).is_err());
        assert!(parse_timestamp_value(&json!(null)).is_err());
    }
}
