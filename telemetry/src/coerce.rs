//! Lenient numeric parsing.
//!
//! None of these helpers fail. Mis-typed input always yields a defined
//! number, or `None` where the caller has to skip the value entirely.

use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Parses an integer, returning `default` when nothing usable is found.
///
/// Floats truncate toward zero. Strings use leading-integer semantics: an
/// optional sign followed by digits, with anything after the digits ignored,
/// so `"3.7"` and `"12abc"` give 3 and 12.
pub fn parse_int_or(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => leading_int(s).unwrap_or(default),
        _ => default,
    }
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let magnitude: i64 = rest[..end].parse().ok()?;

    Some(if negative { -magnitude } else { magnitude })
}

/// Parses a latitude or longitude.
///
/// Strings must be a complete float after trimming. Non-finite values are
/// rejected.
pub fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Parses a client supplied nanosecond timestamp. Only positive integers are
/// accepted, either as JSON numbers or digit strings.
pub fn parse_timestamp(value: Option<&Value>) -> Option<i64> {
    let parsed = match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    parsed.filter(|ts| *ts > 0)
}

/// Current wall clock time in nanoseconds, at millisecond precision.
pub fn now_nanos() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    millis * NANOS_PER_MILLI
}
