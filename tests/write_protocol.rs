//! Versioned write protocol against the in-memory store.

mod common;

use common::{counter_key, profile_key, table, Accounts, Counter, Profile};
use dynarow::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn insert_then_read_back() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    let row = VersionedRow::new(key.clone(), Profile::new("Ada", 36));
    rows.insert(&row).await.unwrap();

    let fetched: VersionedRow<Accounts, Profile> = rows.get(&key).await.unwrap().unwrap();
    assert_eq!(fetched.value.name, "Ada");
    assert_eq!(fetched.status.version, 1);
    assert_eq!(fetched.created_at, row.created_at);
}

#[tokio::test]
async fn insert_is_first_writer_wins() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    rows.insert(&VersionedRow::new(key.clone(), Profile::new("Ada", 36)))
        .await
        .unwrap();

    let err = rows
        .insert(&VersionedRow::new(key, Profile::new("Grace", 30)))
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::AlreadyExists { .. }));
}

#[tokio::test]
async fn clobber_overwrites_lineage() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    let first = VersionedRow::new(key.clone(), Profile::new("Ada", 36));
    rows.insert(&first).await.unwrap();
    let updated = rows.update(&first, Profile::new("Ada", 37)).await.unwrap();
    assert_eq!(updated.status.version, 2);

    // Clobber resets to a fresh version-1 row.
    rows.clobber(&VersionedRow::new(key.clone(), Profile::new("Grace", 30)))
        .await
        .unwrap();
    let fetched: VersionedRow<Accounts, Profile> = rows.get(&key).await.unwrap().unwrap();
    assert_eq!(fetched.status.version, 1);
    assert_eq!(fetched.value.name, "Grace");
}

#[tokio::test]
async fn concurrent_cas_updates_have_one_winner() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    let row = VersionedRow::new(key.clone(), Profile::new("Ada", 36));
    rows.insert(&row).await.unwrap();
    let existing: VersionedRow<Accounts, Profile> = rows.get(&key).await.unwrap().unwrap();

    let first = rows.update(&existing, Profile::new("Ada", 37)).await;
    let second = rows.update(&existing, Profile::new("Ada", 40)).await;

    assert!(first.is_ok());
    assert!(matches!(
        second.unwrap_err(),
        TableError::ConditionalCheckFailed { .. }
    ));

    let fetched: VersionedRow<Accounts, Profile> = rows.get(&key).await.unwrap().unwrap();
    assert_eq!(fetched.value.age, 37);
    assert_eq!(fetched.status.version, 2);
}

#[tokio::test]
async fn conditional_update_retries_to_completion_under_contention() {
    let table = Arc::new(table());
    let key = counter_key("acct#1");

    {
        let rows = Rows::new(table.as_ref(), identity);
        rows.insert(&VersionedRow::new(key.clone(), Counter { count: 0 }))
            .await
            .unwrap();
    }

    let writers = 8;
    let increments_each = 5u64;
    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let table = table.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let rows = Rows::new(table.as_ref(), identity);
                for _ in 0..increments_each {
                    rows.conditionally_update(
                        &key,
                        100,
                        |current: &VersionedRow<Accounts, Counter>| {
                            Ok(Counter {
                                count: current.value.count + 1,
                            })
                        },
                    )
                    .await
                    .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let rows = Rows::new(table.as_ref(), identity);
    let fetched: VersionedRow<Accounts, Counter> = rows.get(&key).await.unwrap().unwrap();
    let total = writers as u64 * increments_each;
    // No lost updates, and the version advanced once per write.
    assert_eq!(fetched.value.count, total);
    assert_eq!(fetched.status.version, total + 1);
}

#[tokio::test]
async fn conditional_update_missing_row_does_not_retry() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let err = rows
        .conditionally_update(
            &profile_key("ghost"),
            3,
            |current: &VersionedRow<Accounts, Profile>| Ok(current.value.clone()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::Unexpected(_)));
}

#[tokio::test]
async fn conditional_update_propagates_callback_error() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    rows.insert(&VersionedRow::new(key.clone(), Profile::new("Ada", 36)))
        .await
        .unwrap();

    let err = rows
        .conditionally_update(&key, 3, |_: &VersionedRow<Accounts, Profile>| {
            Err(TableError::Unexpected("validation failed".to_string()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::Unexpected(msg) if msg == "validation failed"));

    // The stored row is untouched.
    let fetched: VersionedRow<Accounts, Profile> = rows.get(&key).await.unwrap().unwrap();
    assert_eq!(fetched.status.version, 1);
}

#[tokio::test]
async fn conditional_delete_requires_current_version() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    let row = VersionedRow::new(key.clone(), Profile::new("Ada", 36));
    rows.insert(&row).await.unwrap();
    let updated = rows.update(&row, Profile::new("Ada", 37)).await.unwrap();

    // Delete against the superseded row loses.
    let err = rows.delete_conditional(&row).await.unwrap_err();
    assert!(err.is_retryable());

    rows.delete_conditional(&updated).await.unwrap();
    assert!(rows
        .get::<Accounts, Profile>(&key)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn delete_by_key_is_idempotent() {
    let table = table();
    let rows = Rows::new(&table, identity);

    let key = profile_key("acct#1");
    rows.insert(&VersionedRow::new(key.clone(), Profile::new("Ada", 36)))
        .await
        .unwrap();
    rows.delete(&key).await.unwrap();
    rows.delete(&key).await.unwrap();
}
