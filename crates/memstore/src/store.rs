//! The in-memory reference store
//!
//! [`MemoryTable`] implements [`Table`] over nested `BTreeMap`s guarded
//! by one async mutex, so writes serialize through a single-writer queue
//! and sort-key order falls out of the map. It reproduces the backend's
//! conditional semantics exactly, which makes it the fixture every
//! protocol test runs against.

use crate::batch::{BackoffPolicy, UnprocessedSimulation};
use crate::mirror::{IndexMirror, Mutation};
use crate::query::run_query;
use crate::txn::{apply_transaction, precondition_holds, stored, Partitions};
use async_trait::async_trait;
use dynarow_core::{Item, KeySchema, Precondition, TableError, TableKey, TableResult};
use dynarow_table::{Page, Query, Table, TableConfig, MAX_BATCH_GET_ITEMS};
use dynarow_table::TransactWrite;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory table with full conditional-write semantics.
pub struct MemoryTable<K: KeySchema> {
    config: TableConfig,
    partitions: Mutex<Partitions>,
    mirror: Option<Arc<dyn IndexMirror<K>>>,
    backoff: BackoffPolicy,
    unprocessed: Mutex<UnprocessedSimulation>,
}

impl<K: KeySchema> MemoryTable<K> {
    /// Empty table.
    pub fn new(config: TableConfig) -> Self {
        Self {
            config,
            partitions: Mutex::new(Partitions::new()),
            mirror: None,
            backoff: BackoffPolicy::default(),
            unprocessed: Mutex::new(UnprocessedSimulation::default()),
        }
    }

    /// Attach an index mirror, invoked after every successful write.
    pub fn with_mirror(mut self, mirror: Arc<dyn IndexMirror<K>>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Replace the batch-get backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Make the next `rounds` batch-get rounds leave half their keys
    /// unprocessed, to exercise the retry loop.
    pub fn with_unprocessed_rounds(self, rounds: u32) -> Self {
        Self {
            unprocessed: Mutex::new(UnprocessedSimulation::new(rounds)),
            ..self
        }
    }

    /// Total stored items across all partitions.
    pub async fn len(&self) -> usize {
        let guard = self.partitions.lock().await;
        guard.values().map(|items| items.len()).sum()
    }

    /// Whether no items are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of non-empty partitions.
    pub async fn partition_count(&self) -> usize {
        let guard = self.partitions.lock().await;
        guard.values().filter(|items| !items.is_empty()).count()
    }

    /// Every item in one partition, in ascending sort-key order.
    ///
    /// Unpaginated convenience for fixtures and assertions; use
    /// [`Table::query`] for bounded reads.
    pub async fn scan_partition(&self, partition: &str) -> Vec<Item> {
        let guard = self.partitions.lock().await;
        guard
            .get(partition)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Undo one applied mutation.
    fn restore(partitions: &mut Partitions, mutation: &Mutation<K>) {
        let items = partitions
            .entry(mutation.key.partition().to_string())
            .or_default();
        match &mutation.before {
            Some(item) => {
                items.insert(mutation.key.sort().to_string(), item.clone());
            }
            None => {
                items.remove(mutation.key.sort());
            }
        }
    }

    /// Run the mirror for one applied mutation, undoing it on failure.
    async fn mirrored(&self, partitions: &mut Partitions, mutation: Mutation<K>) -> TableResult<()> {
        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.apply(std::slice::from_ref(&mutation)).await {
                tracing::warn!(key = %mutation.key, error = %err, "index mirror failed, rolling back");
                Self::restore(partitions, &mutation);
                return Err(err);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<K: KeySchema> Table<K> for MemoryTable<K> {
    fn config(&self) -> &TableConfig {
        &self.config
    }

    async fn get_item(&self, key: &TableKey<K>) -> TableResult<Option<Item>> {
        let guard = self.partitions.lock().await;
        Ok(stored(&guard, key).cloned())
    }

    async fn insert_item(&self, key: &TableKey<K>, item: Item) -> TableResult<()> {
        let mut guard = self.partitions.lock().await;
        if stored(&guard, key).is_some() {
            return Err(TableError::AlreadyExists {
                key: key.to_string(),
            });
        }
        guard
            .entry(key.partition().to_string())
            .or_default()
            .insert(key.sort().to_string(), item.clone());
        tracing::trace!(key = %key, "inserted item");
        let mutation = Mutation {
            key: key.clone(),
            before: None,
            after: Some(item),
        };
        self.mirrored(&mut guard, mutation).await
    }

    async fn put_item(&self, key: &TableKey<K>, item: Item) -> TableResult<()> {
        let mut guard = self.partitions.lock().await;
        let before = guard
            .entry(key.partition().to_string())
            .or_default()
            .insert(key.sort().to_string(), item.clone());
        tracing::trace!(key = %key, replaced = before.is_some(), "put item");
        let mutation = Mutation {
            key: key.clone(),
            before,
            after: Some(item),
        };
        self.mirrored(&mut guard, mutation).await
    }

    async fn update_item(
        &self,
        key: &TableKey<K>,
        item: Item,
        expected: &Precondition,
    ) -> TableResult<()> {
        let mut guard = self.partitions.lock().await;
        let holds = match stored(&guard, key) {
            Some(existing) => precondition_holds(existing, expected)?,
            None => false,
        };
        if !holds {
            return Err(TableError::ConditionalCheckFailed {
                key: key.to_string(),
            });
        }
        let before = guard
            .entry(key.partition().to_string())
            .or_default()
            .insert(key.sort().to_string(), item.clone());
        let mutation = Mutation {
            key: key.clone(),
            before,
            after: Some(item),
        };
        self.mirrored(&mut guard, mutation).await
    }

    async fn delete_key(&self, key: &TableKey<K>) -> TableResult<()> {
        let mut guard = self.partitions.lock().await;
        let before = guard
            .get_mut(key.partition())
            .and_then(|items| items.remove(key.sort()));
        if before.is_none() {
            // Nothing stored, nothing to mirror.
            return Ok(());
        }
        let mutation = Mutation {
            key: key.clone(),
            before,
            after: None,
        };
        self.mirrored(&mut guard, mutation).await
    }

    async fn delete_item(&self, key: &TableKey<K>, expected: &Precondition) -> TableResult<()> {
        let mut guard = self.partitions.lock().await;
        let holds = match stored(&guard, key) {
            Some(existing) => precondition_holds(existing, expected)?,
            None => false,
        };
        if !holds {
            return Err(TableError::ConditionalCheckFailed {
                key: key.to_string(),
            });
        }
        let before = guard
            .get_mut(key.partition())
            .and_then(|items| items.remove(key.sort()));
        let mutation = Mutation {
            key: key.clone(),
            before,
            after: None,
        };
        self.mirrored(&mut guard, mutation).await
    }

    async fn batch_get(&self, keys: &[TableKey<K>]) -> TableResult<HashMap<TableKey<K>, Item>> {
        let mut found = HashMap::new();
        for chunk in keys.chunks(MAX_BATCH_GET_ITEMS) {
            let mut pending: Vec<&TableKey<K>> = chunk.iter().collect();
            let mut attempt = 0u32;
            loop {
                let shed = self.unprocessed.lock().await.take_round();
                let processed = if shed {
                    pending.len() / 2
                } else {
                    pending.len()
                };
                {
                    let guard = self.partitions.lock().await;
                    for key in pending.drain(..processed) {
                        if let Some(item) = stored(&guard, key) {
                            found.insert(key.clone(), item.clone());
                        }
                    }
                }
                if pending.is_empty() {
                    break;
                }
                if attempt >= self.backoff.max_retries {
                    return Err(TableError::RetriesExhausted {
                        remaining: pending.len(),
                    });
                }
                tracing::debug!(
                    remaining = pending.len(),
                    attempt,
                    "batch get left keys unprocessed, backing off"
                );
                tokio::time::sleep(self.backoff.delay(attempt)).await;
                attempt += 1;
            }
        }
        Ok(found)
    }

    async fn query(&self, query: Query) -> TableResult<Page> {
        let guard = self.partitions.lock().await;
        Ok(run_query(guard.get(&query.partition), &query))
    }

    async fn transact_write(&self, tx: TransactWrite<K>) -> TableResult<()> {
        let mut guard = self.partitions.lock().await;
        // Snapshot for wholesale rollback if the mirror rejects the batch.
        let snapshot = self.mirror.as_ref().map(|_| guard.clone());
        let mutations = apply_transaction(&mut guard, &tx)?;
        tracing::trace!(applied = mutations.len(), "transaction committed");
        if let Some(mirror) = &self.mirror {
            if let Err(err) = mirror.apply(&mutations).await {
                tracing::warn!(error = %err, "index mirror failed, rolling back transaction");
                if let Some(snapshot) = snapshot {
                    *guard = snapshot;
                }
                return Err(err);
            }
        }
        Ok(())
    }
}
