//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use dynarow::prelude::*;

/// Key schema used across the suites: partition is the account id, sort
/// distinguishes record kinds within it.
pub struct Accounts;

impl KeySchema for Accounts {
    const PARTITION_ATTR: &'static str = "accountId";
    const SORT_ATTR: &'static str = "recordKind";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub age: u32,
    pub tags: Vec<String>,
}

impl Profile {
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.to_string(),
            age,
            tags: Vec::new(),
        }
    }
}

impl RowType for Profile {
    const TYPE_TAG: &'static str = "Profile";
}

impl ItemCodec for Profile {
    fn encode_item(&self, names: NameTransform) -> CodecResult<Item> {
        let mut item = Item::new();
        put_field(&mut item, names, "name", &self.name)?;
        put_field(&mut item, names, "age", &self.age)?;
        put_field(&mut item, names, "tags", &self.tags)?;
        Ok(item)
    }

    fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self> {
        Ok(Profile {
            name: req_field(item, names, "name")?,
            age: req_field(item, names, "age")?,
            tags: req_field(item, names, "tags")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub count: u64,
}

impl RowType for Counter {
    const TYPE_TAG: &'static str = "Counter";
}

impl ItemCodec for Counter {
    fn encode_item(&self, names: NameTransform) -> CodecResult<Item> {
        let mut item = Item::new();
        put_field(&mut item, names, "count", &self.count)?;
        Ok(item)
    }

    fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self> {
        Ok(Counter {
            count: req_field(item, names, "count")?,
        })
    }
}

/// Route store logs through the test harness, once per process.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn table() -> MemoryTable<Accounts> {
    init_tracing();
    MemoryTable::new(TableConfig::new("accounts"))
}

pub fn profile_key(account: &str) -> TableKey<Accounts> {
    TableKey::new(account, "profile")
}

pub fn counter_key(account: &str) -> TableKey<Accounts> {
    TableKey::new(account, "counter")
}
