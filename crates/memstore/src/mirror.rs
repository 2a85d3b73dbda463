//! Secondary-index mirroring
//!
//! The store calls its [`IndexMirror`] after every successful primary
//! mutation, while still holding the write lock, so index state never
//! lags a primary write that a later read could observe. A mirror failure
//! rolls the primary mutation back and surfaces the error to the writer.

use crate::store::MemoryTable;
use async_trait::async_trait;
use dynarow_core::{Item, KeySchema, TableKey, TableResult};
use dynarow_table::Table;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// One applied primary mutation, in before/after form.
pub struct Mutation<K> {
    /// Key of the mutated item
    pub key: TableKey<K>,
    /// Stored item before the mutation; `None` for a fresh insert
    pub before: Option<Item>,
    /// Stored item after the mutation; `None` for a delete
    pub after: Option<Item>,
}

impl<K> Clone for Mutation<K> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<K: KeySchema> fmt::Debug for Mutation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("key", &self.key)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Hook invoked with every batch of applied primary mutations.
///
/// Called under the primary write lock: the implementation must not call
/// back into the same table.
#[async_trait]
pub trait IndexMirror<K: KeySchema>: Send + Sync {
    /// Propagate the mutations; an error rolls the primary write back.
    async fn apply(&self, mutations: &[Mutation<K>]) -> TableResult<()>;
}

/// Projects an item into a secondary-index key and item, or `None` when
/// the item has no presence in the index.
pub type Projection<I> = fn(&Item) -> Option<(TableKey<I>, Item)>;

/// Mirror maintaining a global-secondary-index table.
///
/// For each mutation the old projection is removed and the new one
/// written, so the index tracks the primary exactly. Index writes are
/// unconditional; the index carries no version lineage of its own.
pub struct GsiMirror<K, I: KeySchema> {
    index: Arc<MemoryTable<I>>,
    project: Projection<I>,
    _schema: PhantomData<fn() -> K>,
}

impl<K: KeySchema, I: KeySchema> GsiMirror<K, I> {
    /// Mirror into `index` through `project`.
    pub fn new(index: Arc<MemoryTable<I>>, project: Projection<I>) -> Self {
        Self {
            index,
            project,
            _schema: PhantomData,
        }
    }

    /// The backing index table.
    pub fn index(&self) -> &MemoryTable<I> {
        &self.index
    }
}

enum IndexOp<I: KeySchema> {
    Put(TableKey<I>, Item),
    Delete(TableKey<I>),
}

impl<K: KeySchema, I: KeySchema> GsiMirror<K, I> {
    /// Restore the prior index state of already-applied writes, newest
    /// first. Restores are unconditional puts/deletes on the index.
    async fn unwind(&self, applied: Vec<(TableKey<I>, Option<Item>)>) {
        for (key, previous) in applied.into_iter().rev() {
            let restored = match previous {
                Some(item) => self.index.put_item(&key, item).await,
                None => self.index.delete_key(&key).await,
            };
            if let Err(error) = restored {
                tracing::warn!(key = %key, %error, "index unwind failed");
            }
        }
    }
}

#[async_trait]
impl<K: KeySchema, I: KeySchema> IndexMirror<K> for GsiMirror<K, I> {
    async fn apply(&self, mutations: &[Mutation<K>]) -> TableResult<()> {
        // Project the whole batch before touching the index, then keep an
        // undo log so a failure partway through leaves no stray writes.
        let mut plan = Vec::new();
        for mutation in mutations {
            let before = mutation.before.as_ref().and_then(self.project);
            let after = mutation.after.as_ref().and_then(self.project);

            if let Some((old_key, _)) = &before {
                // Skip the delete when the projection lands on the same
                // index key; the put below overwrites it.
                let replaced = after.as_ref().map(|(new_key, _)| new_key == old_key);
                if replaced != Some(true) {
                    plan.push(IndexOp::Delete(old_key.clone()));
                }
            }
            if let Some((new_key, projected)) = after {
                plan.push(IndexOp::Put(new_key, projected));
            }
        }

        let mut applied = Vec::with_capacity(plan.len());
        for op in plan {
            let key = match &op {
                IndexOp::Put(key, _) => key.clone(),
                IndexOp::Delete(key) => key.clone(),
            };
            let previous = match self.index.get_item(&key).await {
                Ok(previous) => previous,
                Err(error) => {
                    self.unwind(applied).await;
                    return Err(error);
                }
            };
            let outcome = match op {
                IndexOp::Put(key, item) => self.index.put_item(&key, item).await,
                IndexOp::Delete(key) => self.index.delete_key(&key).await,
            };
            if let Err(error) = outcome {
                self.unwind(applied).await;
                return Err(error);
            }
            applied.push((key, previous));
        }
        Ok(())
    }
}
