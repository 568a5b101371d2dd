//! Value coercion rules and the total-order comparator.
//!
//! These functions are deliberately total: any value coerces to a number, a
//! boolean, and text. The only fallible conversion is to a date/time. The
//! exact rules (non-numeric text coerces to 0, mixed-type comparisons fall
//! back to text ordering, null sorts before everything) are observable in
//! formula results and are pinned by tests.

use crate::value::Value;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::cmp::Ordering;

/// Numeric coercion used by the arithmetic operators and numeric parameters.
#[must_use]
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Date(d) => d.timestamp_millis() as f64,
        Value::Array(_) | Value::Null => 0.0,
    }
}

/// Boolean coercion used by `!`, `&&`, `||` and boolean parameters.
///
/// Truthiness follows the original host semantics: zero and NaN are falsy,
/// empty text is falsy, null is falsy, everything else is truthy.
#[must_use]
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Text(s) => !s.is_empty(),
        Value::Date(_) | Value::Array(_) => true,
        Value::Null => false,
    }
}

/// Text coercion used by `&` and text parameters: null becomes the empty
/// string, booleans render `true`/`false`, dates render as ISO-8601.
#[must_use]
pub fn to_text(value: &Value) -> String {
    value.to_string()
}

/// Date coercion: dates pass through, ISO-8601 text parses (a bare
/// `YYYY-MM-DD` is taken as UTC midnight), numbers are epoch milliseconds.
#[must_use]
pub fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Text(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => Utc.timestamp_millis_opt(*n as i64).single(),
        Value::Bool(_) | Value::Array(_) | Value::Null => None,
    }
}

/// Total order over values, used by every comparison operator.
///
/// Null sorts before any present value and equals itself. Same-typed values
/// compare natively; differently typed values fall back to comparing their
/// text coercions.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        _ => to_text(a).cmp(&to_text(b)),
    }
}
