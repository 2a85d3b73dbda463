//! The table abstraction
//!
//! [`Table`] is the single seam between the write protocol and whatever
//! actually holds the items: the in-memory reference store, or an adapter
//! over the real backend service. Everything in this crate is written
//! against it; swapping the backend in changes no retry or transaction
//! logic.
//!
//! The seam speaks untyped [`Item`]s; the typed layer above
//! ([`crate::rows::Rows`]) owns encoding and decoding.

use crate::limits::MAX_BATCH_WRITE_ITEMS;
use crate::txn::TransactWrite;
use async_trait::async_trait;
use dynarow_core::{Item, KeySchema, Precondition, TableError, TableKey, TableResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Construction-time configuration for one table instance.
///
/// Fixed for the life of the instance; not part of the hot-path contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Backend table (collection) name
    pub table_name: String,
    /// Whether reads are strongly consistent
    pub consistent_reads: bool,
}

impl TableConfig {
    /// Config with strongly consistent reads.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            consistent_reads: true,
        }
    }

    /// Switch to eventually-consistent reads.
    pub fn eventually_consistent(mut self) -> Self {
        self.consistent_reads = false;
        self
    }
}

/// Sort-key condition for a range query.
///
/// Evaluated by plain string comparison on the sort key; `Between` is
/// inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortCondition {
    /// Sort key equals the operand
    Equals(String),
    /// Sort key strictly below the operand
    LessThan(String),
    /// Sort key at or below the operand
    LessOrEqual(String),
    /// Sort key strictly above the operand
    GreaterThan(String),
    /// Sort key at or above the operand
    GreaterOrEqual(String),
    /// Sort key within the inclusive range
    Between {
        /// Inclusive lower bound
        lower: String,
        /// Inclusive upper bound
        upper: String,
    },
    /// Sort key starts with the operand
    BeginsWith(String),
}

impl SortCondition {
    /// Evaluate the condition against a sort key.
    pub fn matches(&self, sort: &str) -> bool {
        match self {
            SortCondition::Equals(v) => sort == v,
            SortCondition::LessThan(v) => sort < v.as_str(),
            SortCondition::LessOrEqual(v) => sort <= v.as_str(),
            SortCondition::GreaterThan(v) => sort > v.as_str(),
            SortCondition::GreaterOrEqual(v) => sort >= v.as_str(),
            SortCondition::Between { lower, upper } => {
                sort >= lower.as_str() && sort <= upper.as_str()
            }
            SortCondition::BeginsWith(prefix) => sort.starts_with(prefix),
        }
    }
}

/// A sort-key range query over one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Partition to scan
    pub partition: String,
    /// Optional sort-key condition; absent means the whole partition
    pub condition: Option<SortCondition>,
    /// Sort-key order: ascending by default
    pub descending: bool,
    /// Maximum items per page
    pub limit: Option<usize>,
    /// Pagination cursor from the previous page
    pub cursor: Option<Cursor>,
}

impl Query {
    /// Query a whole partition, ascending, unpaginated.
    pub fn partition(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            condition: None,
            descending: false,
            limit: None,
            cursor: None,
        }
    }

    /// Restrict to sort keys matching a condition.
    pub fn condition(mut self, condition: SortCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Return items in descending sort-key order.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Cap the page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a cursor returned by the previous page.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// Opaque pagination cursor.
///
/// Internally an offset into the sorted, filtered result sequence; only
/// valid against an unchanged result set. The reference store recomputes
/// that sequence per call and does not defend against mutation between
/// pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor(pub(crate) usize);

impl Cursor {
    /// Build a cursor from a raw offset.
    pub fn from_offset(offset: usize) -> Self {
        Cursor(offset)
    }

    /// The raw offset.
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Items in this page, in query order
    pub items: Vec<Item>,
    /// Cursor for the next page; absent when the result set is exhausted
    pub next_cursor: Option<Cursor>,
}

/// The storage seam: one interface for the reference store and the real
/// backend adapter.
///
/// All conditional semantics live behind these methods:
/// - `insert_item` is non-destructive and fails with
///   [`TableError::AlreadyExists`] if the key is present
/// - `put_item` clobbers unconditionally
/// - `update_item` / `delete_item` assert the stored (version, created-at)
///   pair and fail with [`TableError::ConditionalCheckFailed`] on mismatch
/// - `delete_key` is idempotent
/// - `transact_write` applies a whole [`TransactWrite`] all-or-nothing
#[async_trait]
pub trait Table<K: KeySchema>: Send + Sync {
    /// This table's construction-time configuration.
    fn config(&self) -> &TableConfig;

    /// Read one item, if present.
    async fn get_item(&self, key: &TableKey<K>) -> TableResult<Option<Item>>;

    /// Store an item only if the key is absent.
    async fn insert_item(&self, key: &TableKey<K>, item: Item) -> TableResult<()>;

    /// Store an item unconditionally, replacing any existing one.
    async fn put_item(&self, key: &TableKey<K>, item: Item) -> TableResult<()>;

    /// Replace an item if the stored version/created-at matches `expected`.
    async fn update_item(
        &self,
        key: &TableKey<K>,
        item: Item,
        expected: &Precondition,
    ) -> TableResult<()>;

    /// Delete by key; succeeds whether or not the key exists.
    async fn delete_key(&self, key: &TableKey<K>) -> TableResult<()>;

    /// Delete an item if the stored version/created-at matches `expected`.
    async fn delete_item(&self, key: &TableKey<K>, expected: &Precondition) -> TableResult<()>;

    /// Fetch up to [`crate::limits::MAX_BATCH_GET_ITEMS`] keys per chunk,
    /// returning the items that exist.
    async fn batch_get(&self, keys: &[TableKey<K>]) -> TableResult<HashMap<TableKey<K>, Item>>;

    /// Sort-key range query with pagination.
    async fn query(&self, query: Query) -> TableResult<Page>;

    /// Apply a transaction all-or-nothing.
    async fn transact_write(&self, tx: TransactWrite<K>) -> TableResult<()>;

    /// Store many items unconditionally, chunked at the batch-write limit.
    ///
    /// Chunks fan out independently; one chunk's failure does not cancel
    /// siblings already in flight, but the aggregate fails if any chunk
    /// failed.
    async fn bulk_put(&self, items: Vec<(TableKey<K>, Item)>) -> TableResult<()> {
        let chunks: Vec<Vec<(TableKey<K>, Item)>> = items
            .chunks(MAX_BATCH_WRITE_ITEMS)
            .map(|c| c.to_vec())
            .collect();
        let results = futures::future::join_all(chunks.into_iter().map(|chunk| async move {
            for (key, item) in chunk {
                self.put_item(&key, item).await?;
            }
            Ok::<(), TableError>(())
        }))
        .await;
        results.into_iter().collect()
    }

    /// Delete many keys, chunked at the batch-write limit.
    ///
    /// Same fan-out semantics as [`Table::bulk_put`].
    async fn delete_many(&self, keys: Vec<TableKey<K>>) -> TableResult<()> {
        let chunks: Vec<Vec<TableKey<K>>> = keys
            .chunks(MAX_BATCH_WRITE_ITEMS)
            .map(|c| c.to_vec())
            .collect();
        let results = futures::future::join_all(chunks.into_iter().map(|chunk| async move {
            for key in &chunk {
                self.delete_key(key).await?;
            }
            Ok::<(), TableError>(())
        }))
        .await;
        results.into_iter().collect()
    }
}
