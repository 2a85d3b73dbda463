//! Versioned row envelope
//!
//! A [`VersionedRow`] wraps a caller payload with the metadata the
//! optimistic-concurrency protocol needs: a version counter, the creation
//! timestamp (immutable for the life of the row), the last-update timestamp,
//! and an optional expiry marker. Version and payload are always replaced
//! together; the version strictly increases by one per successful update.

use crate::time;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::key::TableKey;

/// Version counter plus last-update timestamp.
///
/// Created at version 1; [`RowStatus::advanced`] produces the successor
/// status a successful update stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStatus {
    /// Version counter, >= 1
    pub version: u64,
    /// Timestamp of the last successful write
    pub last_updated: DateTime<Utc>,
}

impl RowStatus {
    /// Status for a freshly inserted row: version 1, updated now.
    pub fn initial() -> Self {
        Self {
            version: 1,
            last_updated: time::now(),
        }
    }

    /// The successor status: version + 1, refreshed timestamp.
    pub fn advanced(&self) -> Self {
        Self {
            version: self.version + 1,
            last_updated: time::now(),
        }
    }
}

/// The (version, created-at) pair a conditional write asserts against.
///
/// An update or conditional delete succeeds only if the stored item still
/// carries exactly this pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    /// Expected stored version
    pub version: u64,
    /// Expected creation timestamp
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}@{}", self.version, time::format_timestamp(&self.created_at))
    }
}

/// Expiry marker for a row.
///
/// Stored as whole epoch seconds (the backend's TTL granularity), so the
/// instant is truncated to the second at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    at: DateTime<Utc>,
}

impl Expiry {
    /// Expire at the given instant, truncated to whole seconds.
    pub fn at(ts: DateTime<Utc>) -> Self {
        let truncated = DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts);
        Self { at: truncated }
    }

    /// Build from raw epoch seconds.
    pub fn from_epoch_seconds(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(|at| Self { at })
    }

    /// The expiry instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.at
    }

    /// Epoch seconds as stored on the wire.
    pub fn epoch_seconds(&self) -> i64 {
        self.at.timestamp()
    }
}

/// Stable type identifier for a row payload.
///
/// The tag is written into every stored item and read back first during
/// polymorphic decode. Tags form a closed set per table; two payload types
/// must never share one.
pub trait RowType {
    /// Stable identifier written as the item's type-tag attribute
    const TYPE_TAG: &'static str;
}

/// A typed row plus the metadata the versioned write protocol maintains.
///
/// `created_at` never changes after insert; `status` and `value` are
/// replaced together on every update via [`VersionedRow::updated`].
pub struct VersionedRow<K, T> {
    /// Composite key addressing this row
    pub key: TableKey<K>,
    /// Creation timestamp, immutable for the life of the row
    pub created_at: DateTime<Utc>,
    /// Version counter and last-update timestamp
    pub status: RowStatus,
    /// Caller payload
    pub value: T,
    /// Optional expiry marker
    pub expiry: Option<Expiry>,
}

impl<K, T> VersionedRow<K, T> {
    /// A fresh row ready for insert: version 1, created now, no expiry.
    pub fn new(key: TableKey<K>, value: T) -> Self {
        Self {
            key,
            created_at: time::now(),
            status: RowStatus::initial(),
            value,
            expiry: None,
        }
    }

    /// Attach an expiry marker.
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// The successor row a successful update stores: same key and
    /// `created_at`, advanced status, replaced payload.
    pub fn updated(&self, value: T) -> Self {
        Self {
            key: self.key.clone(),
            created_at: self.created_at,
            status: self.status.advanced(),
            value,
            expiry: self.expiry.clone(),
        }
    }

    /// The precondition a conditional write against this row asserts.
    pub fn precondition(&self) -> Precondition {
        Precondition {
            version: self.status.version,
            created_at: self.created_at,
        }
    }

    /// Map the payload, keeping all metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> VersionedRow<K, U> {
        VersionedRow {
            key: self.key,
            created_at: self.created_at,
            status: self.status,
            value: f(self.value),
            expiry: self.expiry,
        }
    }
}

// Manual impls: derives would bound the phantom schema parameter.

impl<K, T: Clone> Clone for VersionedRow<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            created_at: self.created_at,
            status: self.status.clone(),
            value: self.value.clone(),
            expiry: self.expiry.clone(),
        }
    }
}

impl<K, T: fmt::Debug> fmt::Debug for VersionedRow<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedRow")
            .field("key", &self.key)
            .field("created_at", &self.created_at)
            .field("status", &self.status)
            .field("value", &self.value)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl<K, T: PartialEq> PartialEq for VersionedRow<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.created_at == other.created_at
            && self.status == other.status
            && self.value == other.value
            && self.expiry == other.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeySchema;

    struct TestSchema;
    impl KeySchema for TestSchema {
        const PARTITION_ATTR: &'static str = "pk";
        const SORT_ATTR: &'static str = "sk";
    }

    fn row(value: &str) -> VersionedRow<TestSchema, String> {
        VersionedRow::new(TableKey::new("user#1", "profile"), value.to_string())
    }

    #[test]
    fn test_new_row_starts_at_version_one() {
        let r = row("Ada");
        assert_eq!(r.status.version, 1);
        assert_eq!(r.value, "Ada");
        assert!(r.expiry.is_none());
    }

    #[test]
    fn test_updated_advances_version_keeps_created_at() {
        let r1 = row("Ada");
        let r2 = r1.updated("Grace".to_string());

        assert_eq!(r2.status.version, 2);
        assert_eq!(r2.created_at, r1.created_at);
        assert_eq!(r2.key, r1.key);
        assert_eq!(r2.value, "Grace");

        let r3 = r2.updated("Edsger".to_string());
        assert_eq!(r3.status.version, 3);
        assert_eq!(r3.created_at, r1.created_at);
    }

    #[test]
    fn test_precondition_captures_version_and_created_at() {
        let r = row("Ada");
        let pre = r.precondition();
        assert_eq!(pre.version, 1);
        assert_eq!(pre.created_at, r.created_at);

        let updated = r.updated("Grace".to_string());
        assert_ne!(updated.precondition(), pre);
    }

    #[test]
    fn test_expiry_truncates_to_seconds() {
        let now = Utc::now();
        let expiry = Expiry::at(now);
        assert_eq!(expiry.epoch_seconds(), now.timestamp());
        assert_eq!(
            Expiry::from_epoch_seconds(expiry.epoch_seconds()),
            Some(expiry)
        );
    }

    #[test]
    fn test_timestamps_are_millisecond_precision() {
        let r = row("Ada");
        assert_eq!(r.created_at.timestamp_subsec_micros() % 1000, 0);
        assert_eq!(r.status.last_updated.timestamp_subsec_micros() % 1000, 0);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let r = row("Ada");
        let created = r.created_at;
        let mapped = r.map(|v| v.len());
        assert_eq!(mapped.value, 3);
        assert_eq!(mapped.created_at, created);
        assert_eq!(mapped.status.version, 1);
    }
}
