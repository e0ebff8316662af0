use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

pub fn display_datetime(datetime: DateTime<Utc>) -> String {
    datetime
        .with_timezone(&chrono::Local)
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Renders a timestamp the way the Astarte APIs do (`2020-10-14T12:27:02.331Z`).
pub fn format_timestamp(datetime: DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts RFC 3339 strings as well as epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(datetime) => DateTime::parse_from_rfc3339(datetime)
            .ok()
            .map(|datetime| datetime.with_timezone(&Utc)),
        Value::Number(millis) => Utc.timestamp_millis_opt(millis.as_i64()?).single(),
        _ => None,
    }
}
