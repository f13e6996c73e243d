use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values above this magnitude are read as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e11;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Reads a timestamp out of an attribute value. Returns `None` for nulls and
/// anything unparsable.
pub fn parse_field_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => parse_time_str(s),
        _ => None,
    }
}

fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() > MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

pub fn parse_time_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    s.parse::<f64>().ok().and_then(from_epoch)
}

/// Seconds from `a` to `b` with millisecond precision.
pub fn seconds_between(a: &DateTime<Utc>, b: &DateTime<Utc>) -> f64 {
    (*b - *a).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn epoch_seconds_and_millis_agree() {
        let secs = parse_field_time(&json!(1_600_000_000)).unwrap();
        let millis = parse_field_time(&json!(1_600_000_000_000_i64)).unwrap();
        assert_eq!(secs, millis);
    }

    #[test]
    fn parses_rfc3339_and_naive_strings() {
        let a = parse_field_time(&json!("2021-05-01T12:00:00Z")).unwrap();
        let b = parse_field_time(&json!("2021-05-01 12:00:00")).unwrap();
        let c = parse_field_time(&json!("2021-05-01T14:00:00+02:00")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn unparsable_values_are_none() {
        assert!(parse_field_time(&json!(null)).is_none());
        assert!(parse_field_time(&json!("yesterday")).is_none());
        assert!(parse_field_time(&json!(true)).is_none());
    }

    #[test]
    fn seconds_between_is_signed() {
        let a = parse_time_str("2021-05-01T12:00:00Z").unwrap();
        let b = parse_time_str("2021-05-01T12:00:30.5Z").unwrap();
        assert_eq!(seconds_between(&a, &b), 30.5);
        assert_eq!(seconds_between(&b, &a), -30.5);
    }
}
