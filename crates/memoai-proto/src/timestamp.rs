//! ISO-8601 timestamps as they appear on the wire.
//!
//! Outbound timestamps use millisecond precision with a `Z` suffix, matching
//! what browsers produce. The backend emits naive local timestamps
//! (`2024-05-01T12:30:00.123456`), which are read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a timestamp for the wire.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a wire timestamp. `None` if it is neither RFC 3339 nor naive ISO-8601.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) mod serde_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(crate) fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*timestamp))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_timestamp(&text)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp {text:?}")))
    }
}
