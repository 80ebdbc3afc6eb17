//! Database utility functions.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp layout used for every stored datetime.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Generate an 8-character hex ID for database entities.
pub fn generate_entity_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

/// Get current datetime as string in SQLite format.
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the SQLite layout and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
