//! Unix timestamp validation.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Convert Unix seconds into a UTC timestamp.
pub fn check_valid_unix_secs(secs: i64) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| ValidationError::InvalidUnixTime {
        value: secs.to_string(),
        reason: "out of representable range".to_string(),
    })
}

/// Check whether a payload value is a valid Unix timestamp.
///
/// Accepts integer JSON numbers and strings holding an integer.
pub fn check_valid_unix_time(value: &Value) -> Result<DateTime<Utc>, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidUnixTime {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let secs = match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| invalid("not an integer number of seconds"))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("string does not hold an integer"))?,
        _ => return Err(invalid("expected an integer or integer string")),
    };
    check_valid_unix_secs(secs)
}

pub fn is_valid_unix_time(value: &Value) -> bool {
    check_valid_unix_time(value).is_ok()
}
