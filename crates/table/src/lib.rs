//! Table access layer
//!
//! The seams between application row types and a partition/sort-key item
//! store:
//!
//! - [`Table`] is the backend trait: untyped item operations (get, the
//!   three conditional write forms, delete, query, batch get, transact
//!   write) plus chunked bulk helpers implemented on top of them.
//! - [`Rows`] wraps a `Table` with the typed versioned-row protocol:
//!   encode/decode through the codec, first-writer-wins inserts,
//!   compare-and-set updates, and the bounded read-modify-write retry
//!   loop.
//! - [`TransactWrite`] and the transactional helpers in [`txn`] extend
//!   that protocol to multi-item atomic writes, classifying cancellations
//!   into retryable primary-only conflicts and terminal mixed failures.
//! - [`diff_items`] generates textual update statements from a structural
//!   item diff, for backends that take statement-form updates.
//!
//! Backend size limits shared by every implementation live in [`limits`].

#![warn(missing_docs)]

pub mod expr;
pub mod limits;
pub mod rows;
pub mod table;
pub mod txn;

pub use expr::{diff_items, render_update_expression, UpdateStatement};
pub use limits::{MAX_BATCH_GET_ITEMS, MAX_BATCH_WRITE_ITEMS, MAX_TRANSACTION_ITEMS};
pub use rows::Rows;
pub use table::{Cursor, Page, Query, SortCondition, Table, TableConfig};
pub use txn::{classify_cancellation, Constraint, TransactWrite, TransactionOutcome, WriteEntry};
