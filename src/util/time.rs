use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

// Parse a snapshot timestamp: RFC3339, or a naive ISO-8601 datetime taken as UTC.
// Returns None if unparseable.
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // "2025-07-15T23:15:09.544178" (no offset)
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }
    None
}

// serde `deserialize_with` for `scraped_at`
pub fn deserialize_timestamp<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    parse_timestamp_str(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {raw}")))
}

// File-name stamp used for default persona output names, e.g. 20250715_231509
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
