//! Range queries, pagination, and the bulk helpers.

mod common;

use common::{table, Accounts, Profile};
use dynarow::prelude::*;
use dynarow::table::MAX_BATCH_WRITE_ITEMS;

fn order_key(n: usize) -> TableKey<Accounts> {
    TableKey::new("acct#1", format!("order#{n:03}"))
}

async fn seed_orders(table: &MemoryTable<Accounts>, count: usize) {
    let rows = Rows::new(table, identity);
    for n in 0..count {
        rows.insert(&VersionedRow::new(
            order_key(n),
            Profile::new(&format!("order {n}"), n as u32),
        ))
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn query_filters_by_sort_condition() {
    let table = table();
    seed_orders(&table, 5).await;
    let rows = Rows::new(&table, identity);
    rows.insert(&VersionedRow::new(
        TableKey::new("acct#1", "profile"),
        Profile::new("Ada", 36),
    ))
    .await
    .unwrap();

    let page = table
        .query(Query::partition("acct#1").condition(SortCondition::BeginsWith("order#".into())))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 5);
    assert!(page.next_cursor.is_none());

    let page = table
        .query(
            Query::partition("acct#1").condition(SortCondition::Between {
                lower: "order#001".into(),
                upper: "order#003".into(),
            }),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 3);
}

#[tokio::test]
async fn pagination_walks_every_item_exactly_once() {
    let table = table();
    seed_orders(&table, 17).await;

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let mut query = Query::partition("acct#1").limit(5);
        if let Some(c) = cursor {
            query = query.cursor(c);
        }
        let page = table.query(query).await.unwrap();
        for item in &page.items {
            let row: VersionedRow<Accounts, Profile> = decode_row(item, identity).unwrap();
            seen.push(row.key.sort().to_string());
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    let expected: Vec<String> = (0..17).map(|n| format!("order#{n:03}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn descending_reverses_sort_order() {
    let table = table();
    seed_orders(&table, 3).await;

    let page = table
        .query(Query::partition("acct#1").descending())
        .await
        .unwrap();
    let sorts: Vec<_> = page
        .items
        .iter()
        .map(|item| decode_row::<Accounts, Profile>(item, identity).unwrap())
        .map(|row| row.key.sort().to_string())
        .collect();
    assert_eq!(sorts, vec!["order#002", "order#001", "order#000"]);
}

#[tokio::test]
async fn query_scope_is_one_partition() {
    let table = table();
    let rows = Rows::new(&table, identity);
    rows.insert(&VersionedRow::new(
        TableKey::new("acct#1", "profile"),
        Profile::new("Ada", 36),
    ))
    .await
    .unwrap();
    rows.insert(&VersionedRow::new(
        TableKey::new("acct#2", "profile"),
        Profile::new("Grace", 30),
    ))
    .await
    .unwrap();

    let page = table.query(Query::partition("acct#1")).await.unwrap();
    assert_eq!(page.items.len(), 1);
    let page = table.query(Query::partition("acct#3")).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn bulk_put_spans_multiple_chunks() {
    let table = table();
    let count = MAX_BATCH_WRITE_ITEMS + 7;
    let items: Vec<(TableKey<Accounts>, Item)> = (0..count)
        .map(|n| {
            let row = VersionedRow::new(order_key(n), Profile::new("bulk", n as u32));
            let item = encode_row(&row, identity).unwrap();
            (row.key, item)
        })
        .collect();
    table.bulk_put(items).await.unwrap();
    assert_eq!(table.len().await, count);
}

#[tokio::test]
async fn delete_many_spans_multiple_chunks() {
    let table = table();
    let count = MAX_BATCH_WRITE_ITEMS * 2 + 3;
    seed_orders(&table, count).await;

    let keys: Vec<TableKey<Accounts>> = (0..count).map(order_key).collect();
    table.delete_many(keys).await.unwrap();
    assert!(table.is_empty().await);
}

#[tokio::test]
async fn batch_get_returns_only_present_keys() {
    let table = table();
    seed_orders(&table, 4).await;

    let keys = vec![order_key(0), order_key(2), order_key(9)];
    let found = table.batch_get(&keys).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.contains_key(&order_key(0)));
    assert!(found.contains_key(&order_key(2)));
    assert!(!found.contains_key(&order_key(9)));
}

#[test]
fn cursors_and_conditions_serialize_for_callers() {
    let condition = SortCondition::Between {
        lower: "order#001".into(),
        upper: "order#009".into(),
    };
    let json = serde_json::to_string(&condition).unwrap();
    let back: SortCondition = serde_json::from_str(&json).unwrap();
    assert_eq!(back, condition);

    let cursor = Cursor::from_offset(42);
    let json = serde_json::to_string(&cursor).unwrap();
    let back: Cursor = serde_json::from_str(&json).unwrap();
    assert_eq!(back.offset(), 42);
}

#[tokio::test]
async fn batch_get_recovers_from_unprocessed_rounds() {
    let table = table()
        .with_backoff(BackoffPolicy {
            base: std::time::Duration::from_millis(1),
            max_retries: 5,
        })
        .with_unprocessed_rounds(3);
    seed_orders(&table, 12).await;

    let keys: Vec<TableKey<Accounts>> = (0..12).map(order_key).collect();
    let found = table.batch_get(&keys).await.unwrap();
    assert_eq!(found.len(), 12);
}
