//! Attribute values for dynarow
//!
//! This module defines the canonical wire value type exchanged with the
//! backing item store. An item is a map from attribute name to [`AttrValue`].
//!
//! ## The tag space
//!
//! 1. `Null` - absence of value
//! 2. `Bool` - boolean true or false
//! 3. `Number` - arbitrary-precision decimal, carried as text
//! 4. `String` - UTF-8 encoded string
//! 5. `Bytes` - arbitrary binary data (base64 text on the wire)
//! 6. `List` - ordered sequence of values
//! 7. `Map` - string-keyed map of values
//! 8. `StringSet` / `NumberSet` / `ByteSet` - backend set types
//!
//! Numbers are carried as decimal text to avoid precision loss; the codec
//! re-parses them through the target numeric type. Bytes and the set kinds
//! exist for wire fidelity but are rejected by the update-diff path.
//!
//! ## Equality rules
//!
//! - Different tags are never equal (no type coercion)
//! - `Number("1")` != `String("1")`
//! - Map keys are unique; list order is significant

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An item as stored by the backend: attribute name to value.
pub type Item = HashMap<String, AttrValue>;

/// Canonical attribute value exchanged with the backing store.
///
/// This is the only wire value model. Every item attribute, every query
/// result, and every update statement operand is an `AttrValue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Absence of value
    Null,

    /// Boolean true or false
    Bool(bool),

    /// Decimal number carried as text
    ///
    /// The backend stores numbers as arbitrary-precision decimals; text
    /// round-trips them without loss. Parsing happens at decode time
    /// through the target numeric type.
    Number(String),

    /// UTF-8 encoded string
    String(String),

    /// Arbitrary binary data
    ///
    /// Representable on the wire but not supported by the update-diff
    /// algorithm.
    Bytes(Vec<u8>),

    /// Ordered sequence of values
    List(Vec<AttrValue>),

    /// String-keyed map of values
    Map(HashMap<String, AttrValue>),

    /// Set of strings (backend SS type)
    StringSet(Vec<String>),

    /// Set of decimal numbers as text (backend NS type)
    NumberSet(Vec<String>),

    /// Set of binary values (backend BS type)
    ByteSet(Vec<Vec<u8>>),
}

impl AttrValue {
    /// Returns the tag name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "Null",
            AttrValue::Bool(_) => "Bool",
            AttrValue::Number(_) => "Number",
            AttrValue::String(_) => "String",
            AttrValue::Bytes(_) => "Bytes",
            AttrValue::List(_) => "List",
            AttrValue::Map(_) => "Map",
            AttrValue::StringSet(_) => "StringSet",
            AttrValue::NumberSet(_) => "NumberSet",
            AttrValue::ByteSet(_) => "ByteSet",
        }
    }

    /// Build a `Number` from any displayable numeric
    pub fn number(n: impl ToString) -> Self {
        AttrValue::Number(n.to_string())
    }

    /// Build a `String` value
    pub fn string(s: impl Into<String>) -> Self {
        AttrValue::String(s.into())
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the decimal text of a number
    pub fn as_number(&self) -> Option<&str> {
        match self {
            AttrValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes slice
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttrValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as list slice
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Try to get as map reference
    pub fn as_map(&self) -> Option<&HashMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Check if this is one of the kinds the update-diff path rejects
    ///
    /// Bytes and the three set kinds can be represented on the wire but
    /// the structural diff never generates statements for them.
    pub fn is_diff_unsupported(&self) -> bool {
        matches!(
            self,
            AttrValue::Bytes(_)
                | AttrValue::StringSet(_)
                | AttrValue::NumberSet(_)
                | AttrValue::ByteSet(_)
        )
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n.to_string())
    }
}

impl From<u64> for AttrValue {
    fn from(n: u64) -> Self {
        AttrValue::Number(n.to_string())
    }
}
