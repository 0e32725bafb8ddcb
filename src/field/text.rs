//! Variable-length string and fixed-width blob codecs.

use super::{ceil_log2, FieldCodec};
use crate::buffer::BitBuffer;
use crate::schema::FieldDescriptor;
use crate::value::FieldValue;
use crate::{CodecError, Result, SchemaError, SchemaResult};

/// Variable-length string:
/// `[ceil(log2(max_length + 1))-bit length prefix][length bytes of content]`.
///
/// The prefix counts content bytes, so `min_size` is the prefix alone (an
/// empty or absent string) and `max_size` is prefix + 8 * max_length. A
/// value longer than the configured maximum is truncated at the byte
/// level; a decoded zero length comes back as absent, which also means an
/// explicitly empty string round-trips to absent. The wire cannot tell
/// the two apart.
pub struct StringCodec<'d> {
    field: &'d FieldDescriptor,
    max_length: usize,
}

impl<'d> StringCodec<'d> {
    pub fn new(field: &'d FieldDescriptor) -> Self {
        Self {
            field,
            max_length: field.max_length.unwrap_or(0),
        }
    }

    fn prefix_bits(&self) -> usize {
        ceil_log2(self.max_length as u64 + 1)
    }
}

impl FieldCodec for StringCodec<'_> {
    fn min_size(&self) -> usize {
        self.prefix_bits()
    }

    fn max_size(&self) -> usize {
        self.prefix_bits() + self.max_length * 8
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field.max_length.is_none() {
            return Err(SchemaError::MissingParameter {
                field: self.field.name.clone(),
                what: "string max_length",
            });
        }
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let content = value.as_string().unwrap_or_default();
        let content = &content.as_bytes()[..content.len().min(self.max_length)];

        let mut bits = BitBuffer::new();
        bits.push_bits(content.len() as u64, self.prefix_bits())?;
        for byte in content {
            bits.push_bits(u64::from(*byte), 8)?;
        }
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        let length = bits.consume_bits(self.prefix_bits())? as usize;
        if length > self.max_length {
            // The prefix width can represent lengths past the configured
            // maximum; any such value is a corrupt stream.
            return Err(CodecError::SizeLawViolation {
                field: self.field.name.clone(),
                declared: self.max_size(),
                actual: self.prefix_bits() + length * 8,
            });
        }
        if length == 0 {
            return Ok(FieldValue::Absent);
        }
        let mut content = Vec::with_capacity(length);
        for _ in 0..length {
            content.push(bits.consume_bits(8)? as u8);
        }
        Ok(FieldValue::String(
            String::from_utf8_lossy(&content).into_owned(),
        ))
    }

    fn describe(&self) -> String {
        format!(
            "string (max {} bytes): {}-bit prefix, {}..{} bits",
            self.max_length,
            self.prefix_bits(),
            self.min_size(),
            self.max_size()
        )
    }
}

/// Fixed-width byte blob of exactly `num_bytes`.
///
/// There is no absent symbol on the wire: a missing or wrong-length value
/// encodes as zero fill, and decode always produces `num_bytes` of data.
pub struct BytesCodec<'d> {
    field: &'d FieldDescriptor,
    num_bytes: usize,
}

impl<'d> BytesCodec<'d> {
    pub fn new(field: &'d FieldDescriptor) -> Self {
        Self {
            field,
            num_bytes: field.num_bytes.unwrap_or(0),
        }
    }
}

impl FieldCodec for BytesCodec<'_> {
    fn min_size(&self) -> usize {
        self.num_bytes * 8
    }

    fn max_size(&self) -> usize {
        self.num_bytes * 8
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field.num_bytes.is_none() {
            return Err(SchemaError::MissingParameter {
                field: self.field.name.clone(),
                what: "bytes num_bytes",
            });
        }
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let mut bits = BitBuffer::new();
        match value.as_bytes() {
            Some(content) if content.len() == self.num_bytes => {
                for byte in content {
                    bits.push_bits(u64::from(*byte), 8)?;
                }
            }
            _ => {
                for _ in 0..self.num_bytes {
                    bits.push_bits(0, 8)?;
                }
            }
        }
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        let mut content = Vec::with_capacity(self.num_bytes);
        for _ in 0..self.num_bytes {
            content.push(bits.consume_bits(8)? as u8);
        }
        Ok(FieldValue::Bytes(content))
    }

    fn describe(&self) -> String {
        format!("bytes ({} bytes): {} bits", self.num_bytes, self.min_size())
    }
}
