//! Row envelope <-> item conversion
//!
//! A stored item is the payload's fields (attribute names run through the
//! caller's [`NameTransform`]) merged at top level with the reserved
//! envelope attributes: the key components named by the [`KeySchema`], the
//! version counter, both timestamps, the optional expiry, and the type tag.
//!
//! Payload fields may not collide with reserved names; the collision is
//! caught at encode time, never silently overwritten.

use crate::decode::AttrDecode;
use crate::encode::AttrEncode;
use crate::names::NameTransform;
use chrono::{DateTime, Utc};
use dynarow_core::{
    AttrValue, CodecError, CodecResult, Expiry, Item, KeySchema, Precondition, RowStatus, RowType,
    TableKey, VersionedRow,
};

/// Reserved attribute holding the version counter.
pub const VERSION_ATTR: &str = "version";
/// Reserved attribute holding the creation timestamp.
pub const CREATED_AT_ATTR: &str = "createdAt";
/// Reserved attribute holding the last-update timestamp.
pub const LAST_UPDATED_ATTR: &str = "lastUpdated";
/// Reserved attribute holding the expiry marker (epoch seconds).
pub const EXPIRY_ATTR: &str = "expiry";
/// Reserved attribute holding the row's type tag.
pub const ROW_TYPE_ATTR: &str = "rowType";

/// The reserved envelope attribute names for a key schema.
pub fn reserved_attrs<K: KeySchema>() -> [&'static str; 7] {
    [
        K::PARTITION_ATTR,
        K::SORT_ATTR,
        VERSION_ATTR,
        CREATED_AT_ATTR,
        LAST_UPDATED_ATTR,
        EXPIRY_ATTR,
        ROW_TYPE_ATTR,
    ]
}

/// Struct-like payload <-> attribute map conversion.
///
/// Implementations read and write their fields through the helpers below so
/// the name transform is threaded through the whole call tree.
///
/// # Examples
///
/// ```
/// use dynarow_codec::item::{put_field, req_field, ItemCodec};
/// use dynarow_codec::names::NameTransform;
/// use dynarow_core::{CodecResult, Item};
/// use std::collections::HashMap;
///
/// #[derive(Debug, PartialEq)]
/// struct Profile {
///     name: String,
///     age: u32,
/// }
///
/// impl ItemCodec for Profile {
///     fn encode_item(&self, names: NameTransform) -> CodecResult<Item> {
///         let mut item = HashMap::new();
///         put_field(&mut item, names, "name", &self.name)?;
///         put_field(&mut item, names, "age", &self.age)?;
///         Ok(item)
///     }
///
///     fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self> {
///         Ok(Profile {
///             name: req_field(item, names, "name")?,
///             age: req_field(item, names, "age")?,
///         })
///     }
/// }
/// ```
pub trait ItemCodec: Sized {
    /// Encode the payload's fields into an attribute map.
    fn encode_item(&self, names: NameTransform) -> CodecResult<Item>;

    /// Decode the payload's fields from an attribute map.
    ///
    /// The map may carry extra attributes (the envelope's reserved ones in
    /// particular); decoders read only the fields they own.
    fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self>;
}

/// Write one payload field under its transformed attribute name.
pub fn put_field<V: AttrEncode>(
    item: &mut Item,
    names: NameTransform,
    field: &str,
    value: &V,
) -> CodecResult<()> {
    item.insert(names(field), value.encode()?);
    Ok(())
}

/// Read one required payload field.
pub fn req_field<V: AttrDecode>(item: &Item, names: NameTransform, field: &str) -> CodecResult<V> {
    let attr = names(field);
    let value = item
        .get(&attr)
        .ok_or(CodecError::MissingAttribute { name: attr })?;
    V::decode(value)
}

/// Read one optional payload field; absent or `Null` decodes to `None`.
pub fn opt_field<V: AttrDecode>(
    item: &Item,
    names: NameTransform,
    field: &str,
) -> CodecResult<Option<V>> {
    match item.get(&names(field)) {
        None | Some(AttrValue::Null) => Ok(None),
        Some(value) => V::decode(value).map(Some),
    }
}

fn req_attr<'a>(item: &'a Item, name: &str) -> CodecResult<&'a AttrValue> {
    item.get(name).ok_or(CodecError::MissingAttribute {
        name: name.to_string(),
    })
}

/// Encode a versioned row into its stored item.
pub fn encode_row<K, T>(row: &VersionedRow<K, T>, names: NameTransform) -> CodecResult<Item>
where
    K: KeySchema,
    T: RowType + ItemCodec,
{
    let mut item = row.value.encode_item(names)?;

    for reserved in reserved_attrs::<K>() {
        if item.contains_key(reserved) {
            return Err(CodecError::ReservedAttribute {
                name: reserved.to_string(),
            });
        }
    }

    item.insert(
        K::PARTITION_ATTR.to_string(),
        AttrValue::string(row.key.partition()),
    );
    item.insert(K::SORT_ATTR.to_string(), AttrValue::string(row.key.sort()));
    item.insert(
        VERSION_ATTR.to_string(),
        AttrValue::number(row.status.version),
    );
    item.insert(CREATED_AT_ATTR.to_string(), row.created_at.encode()?);
    item.insert(
        LAST_UPDATED_ATTR.to_string(),
        row.status.last_updated.encode()?,
    );
    if let Some(expiry) = &row.expiry {
        item.insert(EXPIRY_ATTR.to_string(), expiry.encode()?);
    }
    item.insert(
        ROW_TYPE_ATTR.to_string(),
        AttrValue::string(T::TYPE_TAG),
    );

    Ok(item)
}

/// Decode a stored item back into a versioned row of type `T`.
///
/// The type tag is checked first: a missing tag is a missing attribute, a
/// tag that does not match `T::TYPE_TAG` is a type mismatch.
pub fn decode_row<K, T>(item: &Item, names: NameTransform) -> CodecResult<VersionedRow<K, T>>
where
    K: KeySchema,
    T: RowType + ItemCodec,
{
    let tag = req_attr(item, ROW_TYPE_ATTR)?;
    let tag = tag.as_str().ok_or_else(|| CodecError::TypeMismatch {
        expected: "String",
        actual: tag.type_name().to_string(),
    })?;
    if tag != T::TYPE_TAG {
        return Err(CodecError::TypeMismatch {
            expected: T::TYPE_TAG,
            actual: tag.to_string(),
        });
    }

    let key = item_key::<K>(item)?;
    let version = u64::decode(req_attr(item, VERSION_ATTR)?)?;
    let created_at = DateTime::<Utc>::decode(req_attr(item, CREATED_AT_ATTR)?)?;
    let last_updated = DateTime::<Utc>::decode(req_attr(item, LAST_UPDATED_ATTR)?)?;
    let expiry = match item.get(EXPIRY_ATTR) {
        None | Some(AttrValue::Null) => None,
        Some(value) => Some(Expiry::decode(value)?),
    };
    let value = T::decode_item(item, names)?;

    Ok(VersionedRow {
        key,
        created_at,
        status: RowStatus {
            version,
            last_updated,
        },
        value,
        expiry,
    })
}

/// Extract the composite key from a stored item.
pub fn item_key<K: KeySchema>(item: &Item) -> CodecResult<TableKey<K>> {
    let partition = String::decode(req_attr(item, K::PARTITION_ATTR)?)?;
    let sort = String::decode(req_attr(item, K::SORT_ATTR)?)?;
    Ok(TableKey::new(partition, sort))
}

/// Extract the (version, created-at) precondition a stored item carries.
pub fn item_precondition(item: &Item) -> CodecResult<Precondition> {
    Ok(Precondition {
        version: u64::decode(req_attr(item, VERSION_ATTR)?)?,
        created_at: DateTime::<Utc>::decode(req_attr(item, CREATED_AT_ATTR)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{identity, pascal_case};
    use std::collections::HashMap;

    struct TestSchema;
    impl KeySchema for TestSchema {
        const PARTITION_ATTR: &'static str = "pk";
        const SORT_ATTR: &'static str = "sk";
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Profile {
        name: String,
        age: u32,
        nicknames: Vec<String>,
    }

    impl RowType for Profile {
        const TYPE_TAG: &'static str = "Profile";
    }

    impl ItemCodec for Profile {
        fn encode_item(&self, names: NameTransform) -> CodecResult<Item> {
            let mut item = HashMap::new();
            put_field(&mut item, names, "name", &self.name)?;
            put_field(&mut item, names, "age", &self.age)?;
            put_field(&mut item, names, "nicknames", &self.nicknames)?;
            Ok(item)
        }

        fn decode_item(item: &Item, names: NameTransform) -> CodecResult<Self> {
            Ok(Profile {
                name: req_field(item, names, "name")?,
                age: req_field(item, names, "age")?,
                nicknames: req_field(item, names, "nicknames")?,
            })
        }
    }

    fn sample_row() -> VersionedRow<TestSchema, Profile> {
        VersionedRow::new(
            TableKey::new("user#1", "profile"),
            Profile {
                name: "Ada".into(),
                age: 36,
                nicknames: vec!["countess".into()],
            },
        )
    }

    #[test]
    fn test_row_roundtrip_identity_names() {
        let row = sample_row();
        let item = encode_row(&row, identity).unwrap();
        let back: VersionedRow<TestSchema, Profile> = decode_row(&item, identity).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_row_roundtrip_pascal_names() {
        let row = sample_row();
        let item = encode_row(&row, pascal_case).unwrap();
        assert!(item.contains_key("Nicknames"));
        assert!(!item.contains_key("nicknames"));
        // Envelope attributes are never transformed
        assert!(item.contains_key("version"));

        let back: VersionedRow<TestSchema, Profile> = decode_row(&item, pascal_case).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_encoded_item_carries_envelope() {
        let row = sample_row().with_expiry(Expiry::from_epoch_seconds(2_000_000_000).unwrap());
        let item = encode_row(&row, identity).unwrap();

        assert_eq!(item["pk"], AttrValue::string("user#1"));
        assert_eq!(item["sk"], AttrValue::string("profile"));
        assert_eq!(item[VERSION_ATTR], AttrValue::number(1));
        assert_eq!(item[ROW_TYPE_ATTR], AttrValue::string("Profile"));
        assert_eq!(item[EXPIRY_ATTR], AttrValue::number(2_000_000_000i64));
    }

    #[test]
    fn test_decode_wrong_tag_is_type_mismatch() {
        let row = sample_row();
        let mut item = encode_row(&row, identity).unwrap();
        item.insert(ROW_TYPE_ATTR.to_string(), AttrValue::string("Order"));

        let err = decode_row::<TestSchema, Profile>(&item, identity).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: "Profile",
                actual: "Order".into()
            }
        );
    }

    #[test]
    fn test_decode_missing_tag_is_missing_attribute() {
        let row = sample_row();
        let mut item = encode_row(&row, identity).unwrap();
        item.remove(ROW_TYPE_ATTR);

        let err = decode_row::<TestSchema, Profile>(&item, identity).unwrap_err();
        assert!(matches!(err, CodecError::MissingAttribute { .. }));
    }

    #[test]
    fn test_reserved_collision_rejected() {
        struct Clashing;
        impl RowType for Clashing {
            const TYPE_TAG: &'static str = "Clashing";
        }
        impl ItemCodec for Clashing {
            fn encode_item(&self, _names: NameTransform) -> CodecResult<Item> {
                let mut item = HashMap::new();
                item.insert("version".to_string(), AttrValue::number(99));
                Ok(item)
            }
            fn decode_item(_item: &Item, _names: NameTransform) -> CodecResult<Self> {
                Ok(Clashing)
            }
        }

        let row = VersionedRow::new(TableKey::<TestSchema>::new("p", "s"), Clashing);
        let err = encode_row(&row, identity).unwrap_err();
        assert_eq!(
            err,
            CodecError::ReservedAttribute {
                name: "version".into()
            }
        );
    }

    #[test]
    fn test_item_precondition_matches_row() {
        let row = sample_row();
        let item = encode_row(&row, identity).unwrap();
        assert_eq!(item_precondition(&item).unwrap(), row.precondition());
    }

    #[test]
    fn test_item_key_extraction() {
        let row = sample_row();
        let item = encode_row(&row, identity).unwrap();
        assert_eq!(item_key::<TestSchema>(&item).unwrap(), row.key);
    }
}
