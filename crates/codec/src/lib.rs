//! Item codec for dynarow
//!
//! Converts between typed rows and the tagged wire representation stored by
//! the backend:
//!
//! - [`encode::AttrEncode`] / [`decode::AttrDecode`]: scalar and aggregate
//!   conversion, one wire tag per type, numbers as decimal text
//! - [`item::ItemCodec`]: struct-like payloads, with a caller-supplied
//!   attribute-name transform threaded through the whole call tree
//! - [`item::encode_row`] / [`item::decode_row`]: the versioned row
//!   envelope, including the type-tag attribute
//! - [`tagged::TagRegistry`]: polymorphic decode over a closed set of row
//!   types
//!
//! The codec round-trips: `decode(encode(v)) == v` for every representable
//! `v`.

#![warn(missing_docs)]

pub mod decode;
pub mod encode;
pub mod item;
pub mod names;
pub mod tagged;

pub use decode::AttrDecode;
pub use encode::AttrEncode;
pub use item::{decode_row, encode_row, item_key, item_precondition, ItemCodec};
pub use names::{identity, pascal_case, NameTransform};
pub use tagged::TagRegistry;
