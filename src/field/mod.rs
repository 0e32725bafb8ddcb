//! # Field Codec Contract
//!
//! ## Purpose
//!
//! Per-field-type encode/decode strategies plus the generic key-frame array
//! wrapper built on top of them. Every codec obeys one contract: the number
//! of bits `encode` produces always lies between `min_size()` and
//! `max_size()`, and equals the constant size exactly for fixed-size types.
//! `decode` consumes precisely as many bits as the matching encode wrote.
//! The message framing layer leans on this size law to stream fields
//! back-to-back with no per-field length markers.
//!
//! ## Dispatch
//!
//! Codec selection is a closed match over [`FieldKind`] - a tagged-variant
//! dispatch known at schema-load time, with no runtime type inspection.
//! Adding a field type means adding a variant and an arm here.
//!
//! ## Key-Frame Array Encoding
//!
//! For an array field with declared length L, element 0 is the *key*. The
//! value list is padded to exactly L slots with absent placeholders, every
//! slot is run through the field's transform pipeline (which is how delta-
//! against-key compression is expressed), elements 1..L-1 are written to
//! the stream in order, and the key is written last. Because each finished
//! field is spliced onto the *front* of the message stream, decoding walks
//! backwards: the key comes off first, then elements L-1 down to 1, and the
//! key is finally restored to array position 0. Placing the key last lets
//! its position be found without knowing how many bits the delta elements
//! used, even when elements have variable encoded size.

mod nested;
mod scalar;
mod text;

pub use nested::NestedCodec;
pub use scalar::{BoolCodec, EnumCodec, FloatCodec, IntCodec};
pub use text::{BytesCodec, StringCodec};

use crate::buffer::BitBuffer;
use crate::schema::{FieldDescriptor, FieldKind};
use crate::transform::TransformRegistry;
use crate::value::{FieldValue, ValueMap};
use crate::{CodecError, Result, SchemaError, SchemaResult};
use tracing::trace;

/// Per-field-type strategy: size accounting, packing, unpacking, schema
/// validation and self-description.
pub trait FieldCodec {
    /// Smallest number of bits one encoded element can occupy.
    fn min_size(&self) -> usize;

    /// Largest number of bits one encoded element can occupy. Equal to
    /// [`FieldCodec::min_size`] for fixed-size types.
    fn max_size(&self) -> usize;

    fn is_variable_size(&self) -> bool {
        self.min_size() != self.max_size()
    }

    /// Schema-time correctness check: required parameters present, bounds
    /// usable. Runs once at load; encode/decode may assume it passed.
    fn validate(&self) -> SchemaResult<()>;

    /// Pack one element. An absent or unconvertible value encodes as the
    /// type's reserved absent symbol; the output length always satisfies
    /// the size law.
    fn encode(&self, value: &FieldValue) -> Result<BitBuffer>;

    /// Unpack one element, consuming exactly the bits the matching encode
    /// produced.
    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue>;

    /// One-line human-readable size/metadata report.
    fn describe(&self) -> String;
}

/// Select the codec for a field: closed dispatch over the declared kind.
pub fn codec_for<'d>(field: &'d FieldDescriptor) -> Box<dyn FieldCodec + 'd> {
    match field.kind {
        FieldKind::Int => Box::new(IntCodec::new(field)),
        FieldKind::Float => Box::new(FloatCodec::new(field)),
        FieldKind::Bool => Box::new(BoolCodec::new(field)),
        FieldKind::Enum => Box::new(EnumCodec::new(field)),
        FieldKind::String => Box::new(StringCodec::new(field)),
        FieldKind::Bytes => Box::new(BytesCodec::new(field)),
        FieldKind::Nested => Box::new(NestedCodec::new(field)),
    }
}

/// Schema-time validation for one field: structural rules, then the
/// codec's own parameter checks.
pub fn validate_field(field: &FieldDescriptor) -> SchemaResult<()> {
    if field.array_length == 0 {
        return Err(SchemaError::ZeroArrayLength {
            field: field.name.clone(),
        });
    }
    let codec = codec_for(field);
    codec.validate()?;
    if field.in_header && codec.is_variable_size() {
        return Err(SchemaError::VariableSizeInHeader {
            field: field.name.clone(),
        });
    }
    Ok(())
}

/// Minimum total bits this field occupies, across all array slots.
pub fn field_min_bits(field: &FieldDescriptor) -> usize {
    codec_for(field).min_size() * field.array_length
}

/// Maximum total bits this field occupies, across all array slots.
pub fn field_max_bits(field: &FieldDescriptor) -> usize {
    codec_for(field).max_size() * field.array_length
}

/// Encode one field's value list onto the front of `stream`.
///
/// Applies the key-frame scheme: pad to the declared slot count, run each
/// element through the transform pipeline, write deltas in order, write the
/// key last. The supplied `vals` map is the complete current value map of
/// the message so transforms can see sibling fields.
pub fn encode_field(
    field: &FieldDescriptor,
    transforms: &TransformRegistry,
    vals: &ValueMap,
    stream: &mut BitBuffer,
) -> Result<()> {
    if field.array_length == 0 {
        return Ok(()); // rejected at load; nothing to stream
    }
    let codec = codec_for(field);

    // Every field gets the full slot count, maybe-absent.
    let mut elements = vals.get(&field.name).cloned().unwrap_or_default();
    elements.resize(field.array_length, FieldValue::Absent);

    for (i, element) in elements.iter_mut().enumerate() {
        for transform in &field.transforms {
            transforms.apply(transform, element, i, vals);
        }
    }

    // Deltas first, the key element last.
    for element in elements.iter().skip(1) {
        encode_element(codec.as_ref(), field, element, stream)?;
    }
    encode_element(codec.as_ref(), field, &elements[0], stream)?;

    Ok(())
}

fn encode_element(
    codec: &dyn FieldCodec,
    field: &FieldDescriptor,
    value: &FieldValue,
    stream: &mut BitBuffer,
) -> Result<()> {
    let bits = codec.encode(value)?;
    check_size_law(codec, field, bits.len())?;
    trace!(field = %field.name, bits = %bits, width = bits.len(), "encoded element");
    stream.prepend(bits);
    Ok(())
}

/// Decode one field's value list off the front of `stream`, restoring
/// original array order: the key comes off first and lands in position 0,
/// then elements L-1 down to 1 in their stored order.
pub fn decode_field(field: &FieldDescriptor, stream: &mut BitBuffer) -> Result<Vec<FieldValue>> {
    let codec = codec_for(field);
    let length = field.array_length;
    let mut out = vec![FieldValue::Absent; length];
    let mut key = FieldValue::Absent;

    for i in (1..=length).rev() {
        let before = stream.len();
        let value = codec.decode(stream)?;
        check_size_law(codec.as_ref(), field, before - stream.len())?;
        if i == length {
            key = value; // first off the reversed stream
        } else {
            out[i] = value;
        }
    }

    trace!(field = %field.name, slots = length, "decoded field");
    out[0] = key;
    Ok(out)
}

/// A codec producing or consuming a bit count outside its declared bounds
/// would alias adjacent fields; surface it instead.
fn check_size_law(codec: &dyn FieldCodec, field: &FieldDescriptor, actual: usize) -> Result<()> {
    let (min, max) = (codec.min_size(), codec.max_size());
    if actual < min || actual > max {
        return Err(CodecError::SizeLawViolation {
            field: field.name.clone(),
            declared: max,
            actual,
        });
    }
    Ok(())
}

/// ceil(log2(n)) for n >= 1: the bit width needed to distinguish n symbols.
pub(crate) fn ceil_log2(n: u64) -> usize {
    if n <= 1 {
        0
    } else {
        (u64::BITS - (n - 1).leading_zeros()) as usize
    }
}
