//! Core types for dynarow
//!
//! This crate defines the fundamental vocabulary the rest of the system is
//! written in:
//!
//! - [`AttrValue`] / [`Item`]: the tagged wire value and the item map
//! - [`TableKey`] / [`KeySchema`]: composite keys with a compile-time
//!   attribute-name schema
//! - [`VersionedRow`] / [`RowStatus`]: the versioned row envelope
//! - [`CodecError`] / [`TableError`]: the error taxonomy
//!
//! It has no dependencies on the rest of the workspace.

#![warn(missing_docs)]

pub mod error;
pub mod key;
pub mod row;
pub mod time;
pub mod value;

pub use error::{CancellationReason, CodecError, CodecResult, TableError, TableResult};
pub use key::{KeySchema, TableKey};
pub use row::{Expiry, Precondition, RowStatus, RowType, VersionedRow};
pub use value::{AttrValue, Item};
