//! Field probing over loosely-shaped upstream JSON.

use chrono::{DateTime, Utc};
use serde_json::Value;

use magpie_core::recency::parse_posted_at;

/// Date keys tried, in order, when an upstream has no documented field.
pub(crate) const DATE_KEYS: &[&str] = &[
    "posted_date",
    "created_at",
    "published",
    "date_posted",
    "updated_at",
];

/// First non-empty string under any of `keys`.
pub(crate) fn pick_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| {
        value
            .get(k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// First numeric value under any of `keys`; accepts numbers or numeric
/// strings.
pub(crate) fn pick_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| {
        let v = value.get(k)?;
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// Upstream item id as a string; ids arrive as strings or numbers.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    pick_str(value, &["id"])
        .map(String::from)
        .or_else(|| value.get("id").and_then(Value::as_i64).map(|id| id.to_string()))
}

/// Finds the job array: either the payload itself or the first of
/// `container_keys` holding an array.
pub(crate) fn jobs_array<'a>(value: &'a Value, container_keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Some(array) = value.as_array() {
        return Some(array);
    }
    container_keys
        .iter()
        .find_map(|k| value.get(k).and_then(Value::as_array))
}

/// Timestamp under any of `keys`: date strings in the common formats, or
/// epoch numbers (13 digits are milliseconds).
pub(crate) fn posted_at_from(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|k| {
        let v = value.get(k)?;
        if let Some(s) = v.as_str() {
            return parse_posted_at(s);
        }
        v.as_i64().and_then(epoch_to_datetime)
    })
}

fn epoch_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 1_000_000_000_000 {
        DateTime::from_timestamp_millis(ts)
    } else if ts > 1_000_000_000 {
        DateTime::from_timestamp(ts, 0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_pick_str_follows_alias_order() {
        let value = json!({"position": "Engineer", "title": "Senior Engineer"});
        assert_eq!(pick_str(&value, &["title", "position"]), Some("Senior Engineer"));
        assert_eq!(pick_str(&value, &["position", "title"]), Some("Engineer"));
    }

    #[test]
    fn test_pick_str_skips_empty_values() {
        let value = json!({"title": "  ", "position": "Engineer"});
        assert_eq!(pick_str(&value, &["title", "position"]), Some("Engineer"));
        assert_eq!(pick_str(&value, &["title"]), None);
    }

    #[test]
    fn test_pick_i64_accepts_strings_and_floats() {
        let value = json!({"a": 90000, "b": "120000", "c": 95000.5});
        assert_eq!(pick_i64(&value, &["a"]), Some(90_000));
        assert_eq!(pick_i64(&value, &["b"]), Some(120_000));
        assert_eq!(pick_i64(&value, &["c"]), Some(95_000));
        assert_eq!(pick_i64(&value, &["missing"]), None);
    }

    #[test]
    fn test_id_string_accepts_numbers() {
        assert_eq!(id_string(&json!({"id": 4012})).as_deref(), Some("4012"));
        assert_eq!(id_string(&json!({"id": "a1b2"})).as_deref(), Some("a1b2"));
        assert_eq!(id_string(&json!({})), None);
    }

    #[test]
    fn test_jobs_array_probes_containers() {
        let top = json!([{"title": "A"}]);
        assert_eq!(jobs_array(&top, &["jobs"]).map(Vec::len), Some(1));

        let nested = json!({"results": [{"title": "A"}, {"title": "B"}]});
        assert_eq!(
            jobs_array(&nested, &["jobs", "data", "results", "items"]).map(Vec::len),
            Some(2)
        );
        assert!(jobs_array(&json!({"other": 1}), &["jobs"]).is_none());
    }

    #[test]
    fn test_posted_at_from_strings_and_epochs() {
        let value = json!({"created_at": "2024-06-10T08:30:00Z"});
        assert_eq!(
            posted_at_from(&value, DATE_KEYS),
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap())
        );

        let millis = json!({"createdAt": 1_718_008_200_000_i64});
        assert_eq!(
            posted_at_from(&millis, &["createdAt"]),
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap())
        );

        let secs = json!({"epoch": 1_718_008_200_i64});
        assert_eq!(
            posted_at_from(&secs, &["epoch"]),
            Some(Utc.with_ymd_and_hms(2024, 6, 10, 8, 30, 0).unwrap())
        );
    }
}
