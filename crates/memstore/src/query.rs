//! Query evaluation over one partition
//!
//! A partition is a `BTreeMap` from sort key to item, so ascending
//! sort-key order is the map's iteration order. Pagination is an integer
//! offset into the filtered sequence, recomputed per call.

use dynarow_core::Item;
use dynarow_table::{Cursor, Page, Query};
use std::collections::BTreeMap;

/// Evaluate a query against a partition's sorted items.
pub(crate) fn run_query(partition: Option<&BTreeMap<String, Item>>, query: &Query) -> Page {
    let mut matches: Vec<&Item> = partition
        .map(|items| {
            items
                .iter()
                .filter(|(sort, _)| {
                    query
                        .condition
                        .as_ref()
                        .map_or(true, |cond| cond.matches(sort))
                })
                .map(|(_, item)| item)
                .collect()
        })
        .unwrap_or_default();

    if query.descending {
        matches.reverse();
    }

    let total = matches.len();
    let offset = query.cursor.map_or(0, |c| c.offset()).min(total);
    let end = query
        .limit
        .map_or(total, |limit| offset.saturating_add(limit).min(total));

    let items: Vec<Item> = matches[offset..end].iter().map(|i| (*i).clone()).collect();
    let next_cursor = if end < total {
        Some(Cursor::from_offset(end))
    } else {
        None
    };

    Page { items, next_cursor }
}
