//! Transactional writes
//!
//! A [`TransactWrite`] is a closed set of write entries plus read-only
//! constraints, applied as a single all-or-nothing unit. On cancellation
//! the store reports one [`CancellationReason`] per entry and constraint;
//! [`classify_cancellation`] partitions the failed checks by key so retry
//! helpers can tell "only the primary item raced" (safe to re-read and
//! resubmit) from "other items are implicated" (must not retry blindly).

use crate::rows::Rows;
use crate::table::Table;
use dynarow_codec::{encode_row, ItemCodec, NameTransform};
use dynarow_core::{
    CancellationReason, CodecResult, Item, KeySchema, Precondition, RowType, TableError, TableKey,
    TableResult, VersionedRow,
};

pub use crate::limits::MAX_TRANSACTION_ITEMS;

/// One intended mutation inside a transaction.
///
/// A value, not a live handle: success or failure is decided by the store
/// when the whole unit is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEntry<K> {
    /// Store the item only if the key is absent
    Insert {
        /// Target key
        key: TableKey<K>,
        /// Encoded row
        item: Item,
    },
    /// Replace the item if the stored version/created-at matches
    Update {
        /// Target key
        key: TableKey<K>,
        /// Encoded successor row
        item: Item,
        /// Expected stored (version, created-at)
        expected: Precondition,
    },
    /// Delete by key, whether or not it exists
    DeleteKey {
        /// Target key
        key: TableKey<K>,
    },
    /// Delete the item if the stored version/created-at matches
    DeleteItem {
        /// Target key
        key: TableKey<K>,
        /// Expected stored (version, created-at)
        expected: Precondition,
    },
}

impl<K: KeySchema> WriteEntry<K> {
    /// Entry inserting a fresh row.
    pub fn insert<T>(row: &VersionedRow<K, T>, names: NameTransform) -> CodecResult<Self>
    where
        T: RowType + ItemCodec,
    {
        Ok(WriteEntry::Insert {
            key: row.key.clone(),
            item: encode_row(row, names)?,
        })
    }

    /// Entry replacing `existing` with `new` under CAS.
    ///
    /// `new` is expected to be `existing.updated(..)` - same key, advanced
    /// version.
    pub fn update<T>(
        new: &VersionedRow<K, T>,
        existing: &VersionedRow<K, T>,
        names: NameTransform,
    ) -> CodecResult<Self>
    where
        T: RowType + ItemCodec,
    {
        Ok(WriteEntry::Update {
            key: new.key.clone(),
            item: encode_row(new, names)?,
            expected: existing.precondition(),
        })
    }

    /// Entry deleting by key, unconditionally.
    pub fn delete_key(key: TableKey<K>) -> Self {
        WriteEntry::DeleteKey { key }
    }

    /// Entry deleting `existing` under CAS.
    pub fn delete_item<T>(existing: &VersionedRow<K, T>) -> Self {
        WriteEntry::DeleteItem {
            key: existing.key.clone(),
            expected: existing.precondition(),
        }
    }

    /// The key this entry mutates.
    pub fn key(&self) -> &TableKey<K> {
        match self {
            WriteEntry::Insert { key, .. }
            | WriteEntry::Update { key, .. }
            | WriteEntry::DeleteKey { key }
            | WriteEntry::DeleteItem { key, .. } => key,
        }
    }
}

/// Read-only assertion included in a transaction without being written.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint<K> {
    /// An item with this key exists at exactly this version
    Required {
        /// Asserted key
        key: TableKey<K>,
        /// Expected stored (version, created-at)
        expected: Precondition,
    },
}

impl<K: KeySchema> Constraint<K> {
    /// Assert `existing` is still stored unchanged at apply time.
    pub fn required<T>(existing: &VersionedRow<K, T>) -> Self {
        Constraint::Required {
            key: existing.key.clone(),
            expected: existing.precondition(),
        }
    }

    /// The key this constraint asserts.
    pub fn key(&self) -> &TableKey<K> {
        match self {
            Constraint::Required { key, .. } => key,
        }
    }
}

/// An all-or-nothing unit of write entries and constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactWrite<K> {
    entries: Vec<WriteEntry<K>>,
    constraints: Vec<Constraint<K>>,
}

impl<K: KeySchema> TransactWrite<K> {
    /// Empty transaction.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a write entry.
    pub fn entry(mut self, entry: WriteEntry<K>) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add a read-only constraint.
    pub fn constraint(mut self, constraint: Constraint<K>) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Put an entry ahead of the existing ones.
    ///
    /// The retry helpers use this to make the primary item the first
    /// reported reason.
    pub fn prepend_entry(&mut self, entry: WriteEntry<K>) {
        self.entries.insert(0, entry);
    }

    /// The write entries, in submission order.
    pub fn entries(&self) -> &[WriteEntry<K>] {
        &self.entries
    }

    /// The constraints, in submission order.
    pub fn constraints(&self) -> &[Constraint<K>] {
        &self.constraints
    }

    /// Combined entry + constraint count.
    pub fn len(&self) -> usize {
        self.entries.len() + self.constraints.len()
    }

    /// Whether the transaction is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.constraints.is_empty()
    }

    /// Fail fast if the combined count exceeds the backend limit.
    ///
    /// Checked client-side before any request is issued.
    pub fn check_size(&self) -> TableResult<()> {
        let count = self.len();
        if count > MAX_TRANSACTION_ITEMS {
            return Err(TableError::TransactionTooLarge {
                count,
                limit: MAX_TRANSACTION_ITEMS,
            });
        }
        Ok(())
    }
}

impl<K: KeySchema> Default for TransactWrite<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a canceled transaction's failures relate to the primary item.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    /// Every failed check referred to the primary item.
    ///
    /// Safe for an automatic retry loop to re-read that one item,
    /// recompute, and resubmit the whole transaction.
    PrimaryOnly {
        /// The primary item's last-known stored form, when available
        item: Option<Item>,
    },
    /// At least one failed check referred to a different key (or to no key
    /// at all); callers must not retry blindly.
    Mixed,
}

/// Partition a cancellation's failed checks by the key they refer to.
pub fn classify_cancellation<K: KeySchema>(
    reasons: &[CancellationReason],
    primary: &TableKey<K>,
) -> TransactionOutcome {
    let primary_key = primary.to_string();
    let mut last_known = None;
    for reason in reasons.iter().filter(|r| r.is_failure()) {
        match reason.key() {
            Some(key) if key == primary_key => {
                if let CancellationReason::ConditionalCheckFailed {
                    item: Some(item), ..
                } = reason
                {
                    last_known = Some(item.clone());
                }
            }
            // A different key, or a keyless failure we cannot attribute
            _ => return TransactionOutcome::Mixed,
        }
    }
    TransactionOutcome::PrimaryOnly { item: last_known }
}

impl<'a, S: ?Sized> Rows<'a, S> {
    /// Transactional read-modify-write retry loop.
    ///
    /// Each attempt re-reads the primary row, applies `update_fn` for the
    /// candidate payload, asks `attach` for the secondary entries and
    /// constraints (recomputed every attempt - their state may have moved
    /// too), and submits the whole unit. A cancellation classified
    /// [`TransactionOutcome::PrimaryOnly`] consumes retry budget; a
    /// [`TransactionOutcome::Mixed`] cancellation or any other error is
    /// terminal.
    pub async fn conditionally_update_in_transaction<K, T, F, G>(
        &self,
        key: &TableKey<K>,
        retries: u32,
        mut update_fn: F,
        mut attach: G,
    ) -> TableResult<VersionedRow<K, T>>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
        F: FnMut(&VersionedRow<K, T>) -> TableResult<T>,
        G: FnMut(&VersionedRow<K, T>) -> TableResult<TransactWrite<K>>,
    {
        for attempt in 0..=retries {
            let current = self.get(key).await?.ok_or_else(|| {
                TableError::Unexpected(format!("conditional update target missing: {}", key))
            })?;
            let candidate = update_fn(&current)?;
            let new_row = current.updated(candidate);

            let mut tx = attach(&current)?;
            tx.prepend_entry(WriteEntry::update(&new_row, &current, self.names())?);
            tx.check_size()?;

            match self.table().transact_write(tx).await {
                Ok(()) => return Ok(new_row),
                Err(TableError::TransactionCanceled { reasons }) => {
                    match classify_cancellation(&reasons, key) {
                        TransactionOutcome::PrimaryOnly { .. } => {
                            tracing::debug!(
                                key = %key,
                                attempt,
                                "transaction lost a race on the primary item, re-reading"
                            );
                        }
                        TransactionOutcome::Mixed => {
                            tracing::warn!(
                                key = %key,
                                "transaction canceled with non-primary failures, not retrying"
                            );
                            return Err(TableError::TransactionCanceled { reasons });
                        }
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Err(TableError::ConcurrencyExhausted {
            key: key.to_string(),
            attempts: retries + 1,
        })
    }

    /// Like
    /// [`conditionally_update_in_transaction`](Rows::conditionally_update_in_transaction),
    /// but the primary item may not exist yet.
    ///
    /// Each attempt re-reads the primary and chooses an insert or a CAS
    /// update accordingly - existence is re-decided on every retry since it
    /// may have changed concurrently. `apply_fn` receives the current
    /// payload, if any.
    pub async fn insert_or_update_in_transaction<K, T, F, G>(
        &self,
        key: &TableKey<K>,
        retries: u32,
        mut apply_fn: F,
        mut attach: G,
    ) -> TableResult<VersionedRow<K, T>>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
        F: FnMut(Option<&T>) -> TableResult<T>,
        G: FnMut(Option<&VersionedRow<K, T>>) -> TableResult<TransactWrite<K>>,
    {
        for attempt in 0..=retries {
            let current: Option<VersionedRow<K, T>> = self.get(key).await?;
            let new_row = match &current {
                None => {
                    let value = apply_fn(None)?;
                    VersionedRow::new(key.clone(), value)
                }
                Some(existing) => {
                    let value = apply_fn(Some(&existing.value))?;
                    existing.updated(value)
                }
            };

            let mut tx = attach(current.as_ref())?;
            let entry = match &current {
                None => WriteEntry::insert(&new_row, self.names())?,
                Some(existing) => WriteEntry::update(&new_row, existing, self.names())?,
            };
            tx.prepend_entry(entry);
            tx.check_size()?;

            match self.table().transact_write(tx).await {
                Ok(()) => return Ok(new_row),
                Err(TableError::TransactionCanceled { reasons }) => {
                    match classify_cancellation(&reasons, key) {
                        TransactionOutcome::PrimaryOnly { .. } => {
                            tracing::debug!(
                                key = %key,
                                attempt,
                                existed = current.is_some(),
                                "primary item raced, re-deciding insert vs update"
                            );
                        }
                        TransactionOutcome::Mixed => {
                            return Err(TableError::TransactionCanceled { reasons });
                        }
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Err(TableError::ConcurrencyExhausted {
            key: key.to_string(),
            attempts: retries + 1,
        })
    }
}
