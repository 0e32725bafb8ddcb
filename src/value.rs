//! Field values and value maps.
//!
//! A [`ValueMap`] is the caller-facing currency of the codec: field name to
//! an ordered list of typed values. Every field carries a list, even a
//! scalar (single-element list), so the key-frame array machinery applies
//! uniformly.
//!
//! [`FieldValue`] deliberately supports lenient cross-type reads
//! (`as_i64` on a numeric string, `as_bool` on an integer, and so on)
//! because upstream publish variables frequently arrive as text. A value
//! that cannot be read as the requested type is treated as absent by the
//! field codecs, never as an error.

use std::collections::HashMap;

/// Field name → ordered list of values. Encode input and decode output.
pub type ValueMap = HashMap<String, Vec<FieldValue>>;

/// Tagged union over everything a field can carry.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// No value supplied, or a value out of configured bounds. Encodes as
    /// the type's reserved absent symbol and decodes back to `Absent`.
    #[default]
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Ordered subfield values of a nested message field.
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Integer view. Floats round half away from zero (sign-symmetric);
    /// strings parse as integer or float text; bools map to 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) if f.is_finite() => Some(f.round() as i64),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            FieldValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Bool(b) => Some(f64::from(u8::from(*b))),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Boolean view: integers are false iff zero; strings accept
    /// "true"/"false" (any case) and numeric text.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Int(i) => Some(*i != 0),
            FieldValue::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    s.parse::<i64>().ok().map(|i| i != 0)
                }
            }
            _ => None,
        }
    }

    /// Text view of any scalar value.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_owned())
    }
}

/// Extract `key=value` from a composite publish string.
///
/// Returns the value if `key=` occurs in `content` (terminated by a comma
/// or end of string), otherwise `None`. Used when a field's source variable
/// carries several comma-separated parameters in one publish.
pub fn val_from_string(content: &str, key: &str) -> Option<String> {
    for piece in content.split(',') {
        if let Some((k, v)) = piece.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_owned());
            }
        }
    }
    None
}

/// Split a comma-separated string into individual field values.
///
/// Array-valued fields gather their elements this way when fed from a
/// single text publish.
pub fn explode(content: &str) -> Vec<FieldValue> {
    content
        .split(',')
        .map(|piece| FieldValue::String(piece.trim().to_owned()))
        .collect()
}
