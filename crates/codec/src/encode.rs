//! Scalar and aggregate encoding to attribute values
//!
//! [`AttrEncode`] maps language-level values onto exactly one wire tag
//! each. Numbers become decimal text so no precision is lost in transit;
//! timestamps become ISO-8601 text with millisecond precision.

use base64::Engine;
use chrono::{DateTime, Utc};
use dynarow_core::time::format_timestamp;
use dynarow_core::{AttrValue, CodecResult, Expiry};
use std::collections::HashMap;

/// Encode a value to its wire attribute representation.
pub trait AttrEncode {
    /// Produce the wire value for `self`.
    fn encode(&self) -> CodecResult<AttrValue>;
}

impl AttrEncode for bool {
    fn encode(&self) -> CodecResult<AttrValue> {
        Ok(AttrValue::Bool(*self))
    }
}

impl AttrEncode for String {
    fn encode(&self) -> CodecResult<AttrValue> {
        Ok(AttrValue::String(self.clone()))
    }
}

macro_rules! impl_encode_number {
    ($($ty:ty),* $(,)?) => {$(
        impl AttrEncode for $ty {
            fn encode(&self) -> CodecResult<AttrValue> {
                Ok(AttrValue::Number(self.to_string()))
            }
        }
    )*};
}

impl_encode_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl AttrEncode for DateTime<Utc> {
    fn encode(&self) -> CodecResult<AttrValue> {
        Ok(AttrValue::String(format_timestamp(self)))
    }
}

impl AttrEncode for Expiry {
    fn encode(&self) -> CodecResult<AttrValue> {
        Ok(AttrValue::Number(self.epoch_seconds().to_string()))
    }
}

impl<T: AttrEncode> AttrEncode for Option<T> {
    fn encode(&self) -> CodecResult<AttrValue> {
        match self {
            Some(v) => v.encode(),
            None => Ok(AttrValue::Null),
        }
    }
}

impl<T: AttrEncode> AttrEncode for Vec<T> {
    fn encode(&self) -> CodecResult<AttrValue> {
        let items = self.iter().map(AttrEncode::encode).collect::<CodecResult<_>>()?;
        Ok(AttrValue::List(items))
    }
}

impl<T: AttrEncode> AttrEncode for HashMap<String, T> {
    fn encode(&self) -> CodecResult<AttrValue> {
        let mut map = HashMap::with_capacity(self.len());
        for (k, v) in self {
            map.insert(k.clone(), v.encode()?);
        }
        Ok(AttrValue::Map(map))
    }
}

/// Render an attribute value as statement-operand text.
///
/// Used by update-statement generation: strings are quoted, numbers and
/// booleans bare, bytes base64, lists and maps rendered recursively with
/// deterministic map ordering.
pub fn render_attr_text(value: &AttrValue) -> String {
    match value {
        AttrValue::Null => "NULL".to_string(),
        AttrValue::Bool(b) => b.to_string(),
        AttrValue::Number(n) => n.clone(),
        AttrValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        AttrValue::Bytes(b) => base64::engine::general_purpose::STANDARD.encode(b),
        AttrValue::List(items) => {
            let rendered: Vec<String> = items.iter().map(render_attr_text).collect();
            format!("[{}]", rendered.join(", "))
        }
        AttrValue::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            let rendered: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("'{}': {}", k, render_attr_text(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        AttrValue::StringSet(items) => {
            let rendered: Vec<String> = items.iter().map(|s| format!("'{}'", s)).collect();
            format!("<<{}>>", rendered.join(", "))
        }
        AttrValue::NumberSet(items) => format!("<<{}>>", items.join(", ")),
        AttrValue::ByteSet(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|b| base64::engine::general_purpose::STANDARD.encode(b))
                .collect();
            format!("<<{}>>", rendered.join(", "))
        }
    }
}
