//! Typed row operations over a table
//!
//! [`Rows`] binds a [`Table`] to a name transform and exposes the
//! versioned write protocol: non-destructive insert, destructive clobber,
//! compare-and-swap update and delete, and the bounded
//! conditional-retry loop concurrent writers use to apply
//! read-modify-write updates safely.

use crate::table::Table;
use dynarow_codec::{decode_row, encode_row, ItemCodec, NameTransform};
use dynarow_core::{KeySchema, RowType, TableError, TableKey, TableResult, VersionedRow};

/// Typed view over a table.
///
/// Borrows the table; cheap to copy and hand around. All operations encode
/// and decode through the bound name transform.
pub struct Rows<'a, S: ?Sized> {
    table: &'a S,
    names: NameTransform,
}

impl<'a, S: ?Sized> Rows<'a, S> {
    /// Bind a table to a name transform.
    pub fn new(table: &'a S, names: NameTransform) -> Self {
        Self { table, names }
    }

    /// The bound name transform.
    pub fn names(&self) -> NameTransform {
        self.names
    }

    /// The underlying table.
    pub fn table(&self) -> &'a S {
        self.table
    }
}

impl<'a, S: ?Sized> Clone for Rows<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: ?Sized> Copy for Rows<'a, S> {}

impl<'a, S: ?Sized> Rows<'a, S> {
    /// Read and decode one row, if present.
    pub async fn get<K, T>(&self, key: &TableKey<K>) -> TableResult<Option<VersionedRow<K, T>>>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
    {
        match self.table.get_item(key).await? {
            Some(item) => Ok(Some(decode_row(&item, self.names)?)),
            None => Ok(None),
        }
    }

    /// Store a fresh row, failing with [`TableError::AlreadyExists`] if an
    /// item with the same key is present.
    pub async fn insert<K, T>(&self, row: &VersionedRow<K, T>) -> TableResult<()>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
    {
        let item = encode_row(row, self.names)?;
        self.table.insert_item(&row.key, item).await
    }

    /// Store a row unconditionally, overwriting any existing value and its
    /// version lineage.
    pub async fn clobber<K, T>(&self, row: &VersionedRow<K, T>) -> TableResult<()>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
    {
        let item = encode_row(row, self.names)?;
        self.table.put_item(&row.key, item).await
    }

    /// Compare-and-swap update.
    ///
    /// Succeeds only if the stored item still matches `existing`'s
    /// (version, created-at); the stored version is then exactly
    /// `existing.status.version + 1`. Returns the row as stored.
    pub async fn update<K, T>(
        &self,
        existing: &VersionedRow<K, T>,
        value: T,
    ) -> TableResult<VersionedRow<K, T>>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
    {
        let new_row = existing.updated(value);
        let item = encode_row(&new_row, self.names)?;
        self.table
            .update_item(&new_row.key, item, &existing.precondition())
            .await?;
        Ok(new_row)
    }

    /// Idempotent delete by key.
    pub async fn delete<K>(&self, key: &TableKey<K>) -> TableResult<()>
    where
        K: KeySchema,
        S: Table<K>,
    {
        self.table.delete_key(key).await
    }

    /// Compare-and-swap delete: same precondition as [`Rows::update`].
    pub async fn delete_conditional<K, T>(&self, existing: &VersionedRow<K, T>) -> TableResult<()>
    where
        K: KeySchema,
        S: Table<K>,
    {
        self.table
            .delete_item(&existing.key, &existing.precondition())
            .await
    }

    /// Bounded read-modify-write retry loop.
    ///
    /// Reads the current row, applies `update_fn` to produce the candidate
    /// payload, and attempts a compare-and-swap write. A version race
    /// triggers a fresh read and another attempt, up to `retries` extra
    /// attempts; exhaustion surfaces as
    /// [`TableError::ConcurrencyExhausted`]. An error from `update_fn`
    /// aborts immediately without retrying, as does a missing row - there
    /// is nothing to re-read our way out of.
    pub async fn conditionally_update<K, T, F>(
        &self,
        key: &TableKey<K>,
        retries: u32,
        mut update_fn: F,
    ) -> TableResult<VersionedRow<K, T>>
    where
        K: KeySchema,
        T: RowType + ItemCodec,
        S: Table<K>,
        F: FnMut(&VersionedRow<K, T>) -> TableResult<T>,
    {
        for attempt in 0..=retries {
            let current = self.get(key).await?.ok_or_else(|| {
                TableError::Unexpected(format!("conditional update target missing: {}", key))
            })?;
            let candidate = update_fn(&current)?;
            match self.update(&current, candidate).await {
                Ok(row) => return Ok(row),
                Err(TableError::ConditionalCheckFailed { .. }) => {
                    tracing::debug!(
                        key = %key,
                        attempt,
                        version = current.status.version,
                        "conditional update lost a version race, re-reading"
                    );
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
