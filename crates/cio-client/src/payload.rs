//! Payload helpers: attribute sanitizing and timestamps

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Free-form attributes attached to people, objects and events
pub type Attributes = Map<String, Value>;

/// Serialize `data` into an attribute object.
///
/// Non-finite floats (NaN, infinities) become `null`, a `null` input becomes an
/// empty object and anything that is not a JSON object is rejected. Datetimes
/// should be sent as integer timestamps, e.g. with
/// `#[serde(with = "chrono::serde::ts_seconds")]` or [`datetime_to_timestamp`].
pub fn sanitize<T: Serialize + ?Sized>(data: &T) -> Result<Attributes> {
    match serde_json::to_value(data)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::InvalidArgument(format!(
            "attributes must serialize to a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

/// Unix timestamp in seconds
pub fn datetime_to_timestamp(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Event time accepted by backfill calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTimestamp(pub i64);

impl From<i64> for EventTimestamp {
    fn from(ts: i64) -> Self {
        EventTimestamp(ts)
    }
}

impl From<DateTime<Utc>> for EventTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        EventTimestamp(datetime_to_timestamp(&dt))
    }
}

/// Naive datetimes are read as UTC
impl From<NaiveDateTime> for EventTimestamp {
    fn from(dt: NaiveDateTime) -> Self {
        EventTimestamp(dt.and_utc().timestamp())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Profile {
        first_name: &'static str,
        score: f64,
        #[serde(with = "chrono::serde::ts_seconds")]
        created_at: DateTime<Utc>,
    }

    #[test]
    fn test_sanitize_struct() {
        let created_at = NaiveDate::from_ymd_opt(2022, 12, 8)
            .unwrap()
            .and_hms_opt(12, 0, 59)
            .unwrap()
            .and_utc();
        let attrs = sanitize(&Profile {
            first_name: "John",
            score: f64::NAN,
            created_at,
        })
        .unwrap();

        assert_eq!(attrs["first_name"], "John");
        assert_eq!(attrs["score"], Value::Null);
        assert_eq!(attrs["created_at"], 1670500859);
    }

    #[test]
    fn test_sanitize_map_with_non_finite() {
        let mut data = BTreeMap::new();
        data.insert("a", f64::INFINITY);
        data.insert("b", 1.5);

        let attrs = sanitize(&data).unwrap();
        assert_eq!(attrs["a"], Value::Null);
        assert_eq!(attrs["b"], 1.5);
    }

    #[test]
    fn test_sanitize_null_and_non_objects() {
        assert!(sanitize(&()).unwrap().is_empty());
        assert!(sanitize(&json!(null)).unwrap().is_empty());
        assert!(matches!(sanitize(&json!([1, 2])), Err(Error::InvalidArgument(_))));
        assert!(matches!(sanitize("text"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_sanitize_leaves_input_untouched() {
        let input = json!({"plan": "pro"});
        let attrs = sanitize(&input).unwrap();
        assert_eq!(Value::Object(attrs), input);
    }

    #[test]
    fn test_datetime_to_timestamp() {
        let cases = [
            ((2022, 12, 8, 12, 0, 59), 1670500859),
            ((2022, 12, 31, 23, 59, 59), 1672531199),
            ((2022, 9, 1, 0, 0, 1), 1661990401),
        ];
        for ((y, mo, d, h, mi, s), expected) in cases {
            let naive = NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap();
            assert_eq!(datetime_to_timestamp(&naive.and_utc()), expected);
            assert_eq!(EventTimestamp::from(naive), EventTimestamp(expected));
        }
    }
}
