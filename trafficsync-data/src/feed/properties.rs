//! Conversion of GeoJSON property values into attribute values.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use trafficsync_core::AttributeValue;

/// Wall-clock layouts seen in the feed, tried in order after RFC 3339.
const LOCAL_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S",
];

/// Parse a timestamp property.
///
/// Values with an offset become [`AttributeValue::UniversalTime`]; bare
/// wall-clock values become [`AttributeValue::LocalTime`] and are resolved
/// later by the normalizer.
pub(crate) fn parse_timestamp(text: &str) -> Option<AttributeValue> {
    let trimmed = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(AttributeValue::UniversalTime(instant.with_timezone(&Utc)));
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(AttributeValue::LocalTime)
}

pub(crate) fn convert_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => number
            .as_f64()
            .map_or(AttributeValue::Null, AttributeValue::Number),
        Value::String(text) => AttributeValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => AttributeValue::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("2019-02-12T09:15:00")]
    #[case("2019-02-12T09:15:00.250")]
    #[case("2019-02-12 09:15:00")]
    #[case("12.02.2019 09:15:00")]
    fn reads_wall_clock_formats(#[case] text: &str) {
        let Some(AttributeValue::LocalTime(local)) = parse_timestamp(text) else {
            panic!("{text} should parse as local time");
        };
        assert_eq!(local.format("%Y-%m-%d %H:%M:%S").to_string(), "2019-02-12 09:15:00");
    }

    #[rstest]
    #[case("2019-02-12T09:15:00+01:00", "2019-02-12T08:15:00+00:00")]
    #[case("2019-02-12T08:15:00Z", "2019-02-12T08:15:00+00:00")]
    fn reads_offset_timestamps_as_universal(#[case] text: &str, #[case] expected: &str) {
        let Some(AttributeValue::UniversalTime(instant)) = parse_timestamp(text) else {
            panic!("{text} should parse as universal time");
        };
        assert_eq!(instant.to_rfc3339(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("gestern")]
    #[case("2019-02-30 09:15:00")]
    fn rejects_unreadable_timestamps(#[case] text: &str) {
        assert!(parse_timestamp(text).is_none());
    }

    #[rstest]
    #[case(json!(null), AttributeValue::Null)]
    #[case(json!(true), AttributeValue::Bool(true))]
    #[case(json!(35), AttributeValue::Number(35.0))]
    #[case(json!("frei"), AttributeValue::Text("frei".to_owned()))]
    #[case(json!([1, 2]), AttributeValue::Text("[1,2]".to_owned()))]
    fn converts_json_values(#[case] value: Value, #[case] expected: AttributeValue) {
        assert_eq!(convert_value(&value), expected);
    }
}
