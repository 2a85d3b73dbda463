//! Polymorphic decode over a closed set of row types
//!
//! An untyped stored item is recovered into the caller's sum type by
//! reading the reserved type-tag attribute first and dispatching through a
//! caller-built `{tag -> decoder}` table. Decode stays total: a tag absent
//! from the table is an [`CodecError::UnrecognizedType`], never a panic.

use crate::item::ROW_TYPE_ATTR;
use crate::names::NameTransform;
use dynarow_core::{CodecError, CodecResult, Item};
use std::collections::HashMap;

/// Decoder entry: turns an item into the caller's output type.
pub type DecoderFn<Out> = fn(&Item, NameTransform) -> CodecResult<Out>;

/// Tag-dispatched decoder table for a closed set of row types.
///
/// # Examples
///
/// ```no_run
/// use dynarow_codec::tagged::TagRegistry;
/// use dynarow_codec::names::identity;
/// # use dynarow_core::{CodecResult, Item};
/// # enum AnyRow { A, B }
/// # fn decode_a(_: &Item, _: fn(&str) -> String) -> CodecResult<AnyRow> { Ok(AnyRow::A) }
/// # fn decode_b(_: &Item, _: fn(&str) -> String) -> CodecResult<AnyRow> { Ok(AnyRow::B) }
/// # let item: Item = Default::default();
///
/// let registry = TagRegistry::new()
///     .with("TypeA", decode_a as _)
///     .with("TypeB", decode_b as _);
/// let _row = registry.decode(&item, identity)?;
/// # Ok::<(), dynarow_core::CodecError>(())
/// ```
pub struct TagRegistry<Out> {
    decoders: HashMap<&'static str, DecoderFn<Out>>,
}

impl<Out> TagRegistry<Out> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register a decoder for one tag.
    pub fn with(mut self, tag: &'static str, decoder: DecoderFn<Out>) -> Self {
        self.decoders.insert(tag, decoder);
        self
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode an item by its stored type tag.
    pub fn decode(&self, item: &Item, names: NameTransform) -> CodecResult<Out> {
        let tag_attr = item
            .get(ROW_TYPE_ATTR)
            .ok_or(CodecError::MissingAttribute {
                name: ROW_TYPE_ATTR.to_string(),
            })?;
        let tag = tag_attr.as_str().ok_or_else(|| CodecError::TypeMismatch {
            expected: "String",
            actual: tag_attr.type_name().to_string(),
        })?;
        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| CodecError::UnrecognizedType {
                tag: tag.to_string(),
            })?;
        decoder(item, names)
    }
}

impl<Out> Default for TagRegistry<Out> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{decode_row, encode_row, put_field, req_field, ItemCodec};
    use crate::names::identity;
    use dynarow_core::{KeySchema, RowType, TableKey, VersionedRow};

    struct TestSchema;
    impl KeySchema for TestSchema {
        const PARTITION_ATTR: &'static str = "pk";
        const SORT_ATTR: &'static str = "sk";
    }

    #[derive(Debug, PartialEq)]
    struct Profile {
        name: String,
    }
    impl RowType for Profile {
        const TYPE_TAG: &'static str = "Profile";
    }
    impl ItemCodec for Profile {
        fn encode_item(&self, names: NameTransform) -> CodecResult<Item> {
            let mut item = Item::new();
            put_field(&mut item, names, "name", &self.name)?;
            Ok(item)
        }
        fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self> {
            Ok(Profile {
                name: req_field(item, names, "name")?,
            })
        }
    }

    #[derive(Debug, PartialEq)]
    struct Counter {
        count: u64,
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

    #[derive(Debug, PartialEq)]
    enum AnyRow {
        Profile(VersionedRow<TestSchema, Profile>),
        Counter(VersionedRow<TestSchema, Counter>),
    }

    fn registry() -> TagRegistry<AnyRow> {
        TagRegistry::new()
            .with(Profile::TYPE_TAG, |item, names| {
                decode_row(item, names).map(AnyRow::Profile)
            })
            .with(Counter::TYPE_TAG, |item, names| {
                decode_row(item, names).map(AnyRow::Counter)
            })
    }

    #[test]
    fn test_dispatch_by_tag() {
        let profile = VersionedRow::new(
            TableKey::new("user#1", "profile"),
            Profile { name: "Ada".into() },
        );
        let counter = VersionedRow::new(
            TableKey::new("user#1", "visits"),
            Counter { count: 9 },
        );

        let reg = registry();
        let decoded = reg
            .decode(&encode_row(&profile, identity).unwrap(), identity)
            .unwrap();
        assert_eq!(decoded, AnyRow::Profile(profile));

        let decoded = reg
            .decode(&encode_row(&counter, identity).unwrap(), identity)
            .unwrap();
        assert_eq!(decoded, AnyRow::Counter(counter));
    }

    #[test]
    fn test_unknown_tag_is_unrecognized() {
        let profile = VersionedRow::new(
            TableKey::<TestSchema>::new("user#1", "profile"),
            Profile { name: "Ada".into() },
        );
        let item = encode_row(&profile, identity).unwrap();

        let reg: TagRegistry<AnyRow> = TagRegistry::new().with(Counter::TYPE_TAG, |i, n| {
            decode_row(i, n).map(AnyRow::Counter)
        });
        let err = reg.decode(&item, identity).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnrecognizedType {
                tag: "Profile".into()
            }
        );
    }

    #[test]
    fn test_missing_tag_is_missing_attribute() {
        let reg = registry();
        let err = reg.decode(&Item::new(), identity).unwrap_err();
        assert!(matches!(err, CodecError::MissingAttribute { .. }));
    }
}
