//! Shared type conversion utilities.
//!
//! Parsing helpers for numbers, booleans and timestamps used by the coercion
//! table and the parameter interpolator. The functions return simple
//! `Result<T, String>` so callers can wrap errors into their own error types.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};

/// Truncates a JSON number toward zero.
///
/// Integral numbers are taken as-is; fractional ones are truncated. Returns
/// `None` when the value does not fit an `i64`.
///
/// # Example
/// ```ignore
/// let n: serde_json::Number = serde_json::from_str("1234.0")?;
/// assert_eq!(number_to_i64(&n), Some(1234));
/// ```
pub fn number_to_i64(number: &serde_json::Number) -> Option<i64> {
    if let Some(i) = number.as_i64() {
        return Some(i);
    }
    if let Some(u) = number.as_u64() {
        return i64::try_from(u).ok();
    }
    let truncated = number.as_f64()?.trunc();
    // 2^63 is exactly representable; i64::MAX is not
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

/// Returns the integer value of a JSON number written without a fraction.
pub fn integral_number(number: &serde_json::Number) -> Option<i64> {
    number.as_i64()
}

/// Parses the textual boolean forms accepted by the permissive bool cast.
///
/// # Arguments
/// * `value` - one of `1 t T TRUE true True 0 f F FALSE false False`
///
/// # Returns
/// * `Ok(bool)` - the parsed value
/// * `Err(String)` - Description of the parsing error
pub fn parse_bool_str(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean literal: {other:?}")),
    }
}

/// Parses an RFC 3339 timestamp and normalizes it to UTC.
///
/// # Example
/// ```ignore
/// let ts = parse_rfc3339("2021-05-01T12:00:00Z")?;
/// assert_eq!(ts.timestamp(), 1_619_870_400);
/// ```
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// Formats a timestamp as a MySQL `DATETIME` literal body.
///
/// Fractional seconds are written with microsecond precision and omitted when zero.
pub fn format_datetime(ts: &DateTime<Utc>) -> String {
    if ts.nanosecond() / 1_000 == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Formats a timestamp for log output.
pub fn format_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
