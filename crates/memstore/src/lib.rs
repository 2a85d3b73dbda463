//! In-memory reference store
//!
//! A complete [`Table`](dynarow_table::Table) backend over nested
//! in-process maps: partitioned `BTreeMap`s behind one async mutex, full
//! conditional-write and transaction semantics, sort-key range queries
//! with offset pagination, batch-get backoff with a shed-load test knob,
//! and an [`IndexMirror`] hook for keeping secondary-index tables in
//! sync.
//!
//! The protocol layers in `dynarow-table` are tested against this store;
//! an adapter over the real backend slots in behind the same trait.

#![warn(missing_docs)]

pub mod batch;
pub mod mirror;
pub mod store;

mod query;
mod txn;

pub use batch::BackoffPolicy;
pub use mirror::{GsiMirror, IndexMirror, Mutation, Projection};
pub use store::MemoryTable;
