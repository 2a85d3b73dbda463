//! Attribute name transforms
//!
//! Payload field names are redirected to wire attribute names through a
//! single caller-supplied transform, threaded through the whole
//! encode/decode call tree. The two provided transforms cover the common
//! conventions; reserved envelope attributes are never transformed.

/// Maps a payload field name to its wire attribute name.
pub type NameTransform = fn(&str) -> String;

/// Use field names as-is.
pub fn identity(name: &str) -> String {
    name.to_string()
}

/// `snake_case` field names to `PascalCase` wire attributes.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for segment in name.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
