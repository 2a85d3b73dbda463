//! Decoding attribute values back into typed values
//!
//! Every decoder checks the wire tag first and fails with a type mismatch
//! if it is wrong; numbers are re-parsed through the target numeric type's
//! parser, and a parse failure is also a type mismatch. Decode errors are
//! never retried - they indicate a schema mismatch.

use chrono::{DateTime, Utc};
use dynarow_core::time::parse_timestamp;
use dynarow_core::{AttrValue, CodecError, CodecResult, Expiry};
use std::collections::HashMap;

/// Decode a wire attribute value into a typed value.
pub trait AttrDecode: Sized {
    /// Decode `value`, failing with [`CodecError::TypeMismatch`] on a
    /// wrong tag or non-conforming text.
    fn decode(value: &AttrValue) -> CodecResult<Self>;
}

fn mismatch(expected: &'static str, actual: &AttrValue) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        actual: actual.type_name().to_string(),
    }
}

impl AttrDecode for bool {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        value.as_bool().ok_or_else(|| mismatch("Bool", value))
    }
}

impl AttrDecode for String {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

macro_rules! impl_decode_number {
    ($($ty:ty),* $(,)?) => {$(
        impl AttrDecode for $ty {
            fn decode(value: &AttrValue) -> CodecResult<Self> {
                match value {
                    AttrValue::Number(text) => {
                        text.parse::<$ty>().map_err(|_| CodecError::TypeMismatch {
                            expected: stringify!($ty),
                            actual: format!("Number({:?})", text),
                        })
                    }
                    other => Err(mismatch(stringify!($ty), other)),
                }
            }
        }
    )*};
}

impl_decode_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl AttrDecode for DateTime<Utc> {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        match value {
            AttrValue::String(text) => {
                parse_timestamp(text).ok_or_else(|| CodecError::TypeMismatch {
                    expected: "Timestamp",
                    actual: format!("String({:?})", text),
                })
            }
            other => Err(mismatch("Timestamp", other)),
        }
    }
}

impl AttrDecode for Expiry {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        let seconds = i64::decode(value)?;
        Expiry::from_epoch_seconds(seconds).ok_or(CodecError::TypeMismatch {
            expected: "Expiry",
            actual: format!("Number({})", seconds),
        })
    }
}

impl<T: AttrDecode> AttrDecode for Option<T> {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        match value {
            AttrValue::Null => Ok(None),
            other => T::decode(other).map(Some),
        }
    }
}

impl<T: AttrDecode> AttrDecode for Vec<T> {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        match value {
            AttrValue::List(items) => items.iter().map(T::decode).collect(),
            other => Err(mismatch("List", other)),
        }
    }
}

impl<T: AttrDecode> AttrDecode for HashMap<String, T> {
    fn decode(value: &AttrValue) -> CodecResult<Self> {
        match value {
            AttrValue::Map(entries) => {
                let mut out = HashMap::with_capacity(entries.len());
                for (k, v) in entries {
                    out.insert(k.clone(), T::decode(v)?);
                }
                Ok(out)
            }
            other => Err(mismatch("Map", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::AttrEncode;

    #[test]
    fn test_decode_scalars() {
        assert!(bool::decode(&AttrValue::Bool(true)).unwrap());
        assert_eq!(i64::decode(&AttrValue::number(-7)).unwrap(), -7);
        assert_eq!(String::decode(&AttrValue::string("x")).unwrap(), "x");
    }

    #[test]
    fn test_decode_wrong_tag_is_mismatch() {
        let err = i64::decode(&AttrValue::string("7")).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { expected: "i64", .. }));

        let err = bool::decode(&AttrValue::Null).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { expected: "Bool", .. }));
    }

    #[test]
    fn test_decode_number_parse_failure_is_mismatch() {
        // Valid wire number, wrong target range
        let err = u8::decode(&AttrValue::Number("300".into())).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { expected: "u8", .. }));

        let err = i64::decode(&AttrValue::Number("not-a-number".into())).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn test_decode_timestamp() {
        let ts = DateTime::from_timestamp_millis(1_714_566_645_123).unwrap();
        let wire = ts.encode().unwrap();
        assert_eq!(DateTime::<Utc>::decode(&wire).unwrap(), ts);

        let err = DateTime::<Utc>::decode(&AttrValue::string("2024-05-01")).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch { expected: "Timestamp", .. }
        ));
    }

    #[test]
    fn test_decode_option_null_is_none() {
        assert_eq!(Option::<i64>::decode(&AttrValue::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::decode(&AttrValue::number(3)).unwrap(),
            Some(3)
        );
    }

    #[test]
    fn test_decode_aggregates_roundtrip() {
        let list = vec![1i64, 2, 3];
        assert_eq!(Vec::<i64>::decode(&list.encode().unwrap()).unwrap(), list);

        let mut map = HashMap::new();
        map.insert("k".to_string(), "v".to_string());
        assert_eq!(
            HashMap::<String, String>::decode(&map.encode().unwrap()).unwrap(),
            map
        );
    }

    #[test]
    fn test_decode_list_inner_error_propagates() {
        let wire = AttrValue::List(vec![AttrValue::number(1), AttrValue::string("x")]);
        assert!(Vec::<i64>::decode(&wire).is_err());
    }
}
