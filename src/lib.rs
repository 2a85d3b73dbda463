//! Typed, versioned row layer over a partition/sort-key item store.
//!
//! `dynarow` layers a structured-value codec and an optimistic-concurrency
//! write protocol over any store addressable by a composite
//! (partition, sort) key:
//!
//! - `dynarow-core`: the attribute value model, composite keys, the
//!   versioned row envelope, and the shared error taxonomy.
//! - `dynarow-codec`: payload <-> item conversion with attribute-name
//!   transforms, plus tag-dispatched polymorphic decode.
//! - `dynarow-table`: the [`Table`](prelude::Table) backend seam, the
//!   typed [`Rows`](prelude::Rows) protocol (first-writer-wins insert,
//!   compare-and-set update, bounded retry loops), multi-item
//!   transactions with cancellation classification, and update-statement
//!   generation.
//! - `dynarow-memstore`: a complete in-memory backend with the same
//!   conditional semantics, range queries, batch backoff, and
//!   secondary-index mirroring.
//!
//! # Example
//!
//! ```no_run
//! use dynarow::prelude::*;
//!
//! struct Accounts;
//! impl KeySchema for Accounts {
//!     const PARTITION_ATTR: &'static str = "accountId";
//!     const SORT_ATTR: &'static str = "recordKind";
//! }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Profile {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl RowType for Profile {
//!     const TYPE_TAG: &'static str = "Profile";
//! }
//!
//! impl ItemCodec for Profile {
//!     fn encode_item(&self, names: NameTransform) -> CodecResult<Item> {
//!         let mut item = Item::new();
//!         put_field(&mut item, names, "name", &self.name)?;
//!         put_field(&mut item, names, "age", &self.age)?;
//!         Ok(item)
//!     }
//!
//!     fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self> {
//!         Ok(Profile {
//!             name: req_field(item, names, "name")?,
//!             age: req_field(item, names, "age")?,
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> dynarow::Result<()> {
//!     let table = MemoryTable::new(TableConfig::new("accounts"));
//!     let rows = Rows::new(&table, identity);
//!
//!     let key = TableKey::<Accounts>::new("acct#1", "profile");
//!     let row = VersionedRow::new(key.clone(), Profile { name: "Ada".into(), age: 36 });
//!     rows.insert(&row).await?;
//!
//!     // Lost version races re-read and retry, up to the given budget.
//!     let updated = rows
//!         .conditionally_update(&key, 3, |current: &VersionedRow<Accounts, Profile>| {
//!             let mut profile = current.value.clone();
//!             profile.age += 1;
//!             Ok(profile)
//!         })
//!         .await?;
//!     assert_eq!(updated.status.version, 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod prelude;

pub use error::{Error, Result};

pub use dynarow_codec as codec;
pub use dynarow_core as model;
pub use dynarow_memstore as memstore;
pub use dynarow_table as table;
