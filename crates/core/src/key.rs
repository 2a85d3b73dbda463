//! Composite keys
//!
//! A [`TableKey`] is the (partition key, sort key) pair addressing one item.
//! The type parameter `K: KeySchema` carries the attribute-name schema at
//! compile time only - which literal attribute names hold the partition and
//! sort key, and the name of an optional secondary index. It has no runtime
//! representation.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Attribute-name schema for a table.
///
/// Implementors are zero-sized marker types; the constants name the
/// attributes the key components are stored under, fixed per table.
///
/// # Examples
///
/// ```
/// use dynarow_core::key::KeySchema;
///
/// struct Accounts;
/// impl KeySchema for Accounts {
///     const PARTITION_ATTR: &'static str = "pk";
///     const SORT_ATTR: &'static str = "sk";
/// }
/// ```
pub trait KeySchema: Send + Sync + 'static {
    /// Attribute name holding the partition key
    const PARTITION_ATTR: &'static str;
    /// Attribute name holding the sort key
    const SORT_ATTR: &'static str;
    /// Name of the secondary index mirrored from this table, if any
    const INDEX_NAME: Option<&'static str> = None;
}

/// Composite (partition, sort) key for one item.
///
/// Immutable once constructed. Equality and ordering are lexicographic on
/// `(partition, sort)`; the schema parameter carries no data and does not
/// participate in comparisons.
pub struct TableKey<K> {
    partition: String,
    sort: String,
    _schema: PhantomData<fn() -> K>,
}

impl<K> TableKey<K> {
    /// Create a new composite key
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
            _schema: PhantomData,
        }
    }

    /// The partition key component
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// The sort key component
    pub fn sort(&self) -> &str {
        &self.sort
    }
}

// Manual impls: derives would bound K, which carries no data.

impl<K> Clone for TableKey<K> {
    fn clone(&self) -> Self {
        Self {
            partition: self.partition.clone(),
            sort: self.sort.clone(),
            _schema: PhantomData,
        }
    }
}

impl<K> fmt::Debug for TableKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableKey")
            .field("partition", &self.partition)
            .field("sort", &self.sort)
            .finish()
    }
}

impl<K> fmt::Display for TableKey<K> {
    /// Display format: `partition/sort`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

impl<K> PartialEq for TableKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.partition == other.partition && self.sort == other.sort
    }
}

impl<K> Eq for TableKey<K> {}

impl<K> Hash for TableKey<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.partition.hash(state);
        self.sort.hash(state);
    }
}

impl<K> Ord for TableKey<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partition
            .cmp(&other.partition)
            .then_with(|| self.sort.cmp(&other.sort))
    }
}

impl<K> PartialOrd for TableKey<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
