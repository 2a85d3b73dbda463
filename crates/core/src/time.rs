//! Timestamp handling
//!
//! The wire format carries timestamps as ISO-8601 text with millisecond
//! precision and a literal `Z` suffix, e.g. `2024-05-01T12:30:45.123Z`.
//! Anything finer than a millisecond cannot round-trip, so row timestamps
//! are always truncated to millisecond precision at creation time.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Wire format for timestamps: millisecond precision, fixed UTC suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current time, truncated to millisecond precision.
pub fn now() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

/// Truncate a timestamp to millisecond precision.
pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis())
        .unwrap_or(ts)
}

/// Format a timestamp in the wire format.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a wire-format timestamp.
///
/// Returns `None` if the text does not conform exactly; the codec maps
/// that to a type-mismatch error.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
