//! Timestamp handling for server JSON.
//!
//! The backend's timestamps show up either as RFC 3339 strings, zone-less
//! ISO strings, or epoch milliseconds depending on the endpoint. We accept
//! all three and treat anything unreadable as "no timestamp" rather than
//! failing the whole payload.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a server timestamp string. Zone-less values are taken as UTC.
pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for required timestamp fields. Serializes as RFC 3339
/// with millisecond precision (`2026-03-01T10:00:00.000Z`), the shape the
/// server's message mapping expects.
pub mod required {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::parse(&text)
            .ok_or_else(|| D::Error::custom(format!("unreadable timestamp: {:?}", text)))
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using the lenient
/// parse above. Serializes as RFC 3339 with millisecond precision.
pub mod option {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => super::parse(&text),
            Some(Raw::Millis(millis)) => DateTime::from_timestamp_millis(millis),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde::Deserialize;

    #[test]
    fn parses_rfc3339_with_zone() {
        let ts = parse("2026-03-01T10:15:30.250+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
        assert_eq!(ts.minute(), 15);
    }

    #[test]
    fn parses_zoneless_as_utc() {
        let ts = parse("2026-03-01T10:15:30.25").unwrap();
        assert_eq!(ts.year(), 2026);
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("yesterday").is_none());
        assert!(parse("").is_none());
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, with = "option")]
        ts: Option<chrono::DateTime<Utc>>,
    }

    #[test]
    fn adapter_accepts_epoch_millis() {
        let holder: Holder = serde_json::from_str(r#"{"ts":1767225600000}"#).unwrap();
        assert_eq!(holder.ts.unwrap().year(), 2026);
    }

    #[test]
    fn adapter_accepts_null_and_missing() {
        let holder: Holder = serde_json::from_str(r#"{"ts":null}"#).unwrap();
        assert!(holder.ts.is_none());
        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert!(holder.ts.is_none());
    }

    #[test]
    fn adapter_swallows_unreadable_values() {
        let holder: Holder = serde_json::from_str(r#"{"ts":"not a date"}"#).unwrap();
        assert!(holder.ts.is_none());
    }
}
