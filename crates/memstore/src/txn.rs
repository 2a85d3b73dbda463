//! Transaction evaluation
//!
//! A transaction is applied in two phases under the write lock: every
//! entry and constraint is checked against current state first, and only
//! if all checks pass are the writes applied. Cancellation reports one
//! reason per entry and constraint, in submission order, so callers can
//! classify which keys raced.

use crate::mirror::Mutation;
use dynarow_codec::item_precondition;
use dynarow_core::{
    CancellationReason, Item, KeySchema, Precondition, TableError, TableResult,
};
use dynarow_table::{Constraint, TransactWrite, WriteEntry};
use std::collections::BTreeMap;

pub(crate) type Partitions = BTreeMap<String, BTreeMap<String, Item>>;

pub(crate) fn stored<'a, K: KeySchema>(
    partitions: &'a Partitions,
    key: &dynarow_core::TableKey<K>,
) -> Option<&'a Item> {
    partitions
        .get(key.partition())
        .and_then(|items| items.get(key.sort()))
}

/// Whether a stored item satisfies an expected (version, created-at).
pub(crate) fn precondition_holds(item: &Item, expected: &Precondition) -> TableResult<bool> {
    Ok(item_precondition(item)? == *expected)
}

/// Check an entry against current state, without mutating.
fn check_entry<K: KeySchema>(
    partitions: &Partitions,
    entry: &WriteEntry<K>,
) -> TableResult<CancellationReason> {
    match entry {
        WriteEntry::Insert { key, .. } => match stored(partitions, key) {
            Some(_) => Ok(CancellationReason::DuplicateItem {
                key: key.to_string(),
            }),
            None => Ok(CancellationReason::None),
        },
        WriteEntry::Update { key, expected, .. } | WriteEntry::DeleteItem { key, expected } => {
            match stored(partitions, key) {
                Some(item) if precondition_holds(item, expected)? => Ok(CancellationReason::None),
                existing => Ok(CancellationReason::ConditionalCheckFailed {
                    key: key.to_string(),
                    item: existing.cloned(),
                }),
            }
        }
        WriteEntry::DeleteKey { .. } => Ok(CancellationReason::None),
    }
}

fn check_constraint<K: KeySchema>(
    partitions: &Partitions,
    constraint: &Constraint<K>,
) -> TableResult<CancellationReason> {
    match constraint {
        Constraint::Required { key, expected } => match stored(partitions, key) {
            Some(item) if precondition_holds(item, expected)? => Ok(CancellationReason::None),
            existing => Ok(CancellationReason::ConditionalCheckFailed {
                key: key.to_string(),
                item: existing.cloned(),
            }),
        },
    }
}

/// Apply one entry, returning the resulting mutation.
///
/// Only called after every check passed, so entry preconditions are known
/// to hold.
fn apply_entry<K: KeySchema>(partitions: &mut Partitions, entry: &WriteEntry<K>) -> Mutation<K> {
    match entry {
        WriteEntry::Insert { key, item } | WriteEntry::Update { key, item, .. } => {
            let before = partitions
                .entry(key.partition().to_string())
                .or_default()
                .insert(key.sort().to_string(), item.clone());
            Mutation {
                key: key.clone(),
                before,
                after: Some(item.clone()),
            }
        }
        WriteEntry::DeleteKey { key } | WriteEntry::DeleteItem { key, .. } => {
            let before = partitions
                .get_mut(key.partition())
                .and_then(|items| items.remove(key.sort()));
            Mutation {
                key: key.clone(),
                before,
                after: None,
            }
        }
    }
}

/// Check and apply a whole transaction against the partition maps.
///
/// Returns the applied mutations in submission order, or
/// [`TableError::TransactionCanceled`] with one reason per entry and
/// constraint; on cancellation the maps are untouched.
pub(crate) fn apply_transaction<K: KeySchema>(
    partitions: &mut Partitions,
    tx: &TransactWrite<K>,
) -> TableResult<Vec<Mutation<K>>> {
    tx.check_size()?;

    let mut reasons = Vec::with_capacity(tx.len());
    for entry in tx.entries() {
        reasons.push(check_entry(partitions, entry)?);
    }
    for constraint in tx.constraints() {
        reasons.push(check_constraint(partitions, constraint)?);
    }

    if reasons.iter().any(CancellationReason::is_failure) {
        return Err(TableError::TransactionCanceled { reasons });
    }

    Ok(tx
        .entries()
        .iter()
        .map(|entry| apply_entry(partitions, entry))
        .collect())
}
