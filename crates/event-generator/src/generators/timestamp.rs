//! Timestamp value generators.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::plan::TimestampUnit;

/// Generate the current UTC timestamp.
///
/// This is NOT deterministic - each call returns the current time.
pub fn generate_timestamp_now(unit: TimestampUnit) -> Value {
    let now = Utc::now();
    match unit {
        TimestampUnit::Iso8601 => Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, false)),
        TimestampUnit::Millis => Value::from(now.timestamp_millis()),
        TimestampUnit::Micros => Value::from(now.timestamp_micros()),
    }
}
