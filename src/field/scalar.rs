//! Fixed-size scalar codecs: bounded integers, scaled floats, booleans and
//! enumerations.
//!
//! All four share one numbering scheme: the width is the smallest number of
//! bits distinguishing every real value plus one reserved absent symbol
//! (encoded zero). An out-of-range or unconvertible value encodes as
//! absent rather than failing the message.

use super::{ceil_log2, FieldCodec};
use crate::buffer::BitBuffer;
use crate::schema::FieldDescriptor;
use crate::value::FieldValue;
use crate::{Result, SchemaError, SchemaResult};

/// Widest usable value range; keeps every width computation inside u64.
const MAX_RANGE: u64 = 1 << 62;

/// Bounded signed integer. Width = ceil(log2(max - min + 2)); wire value is
/// `value - min + 1`, zero reserved for absent.
pub struct IntCodec<'d> {
    field: &'d FieldDescriptor,
    min: i64,
    max: i64,
}

impl<'d> IntCodec<'d> {
    pub fn new(field: &'d FieldDescriptor) -> Self {
        Self {
            field,
            min: field.int_min.unwrap_or(0),
            max: field.int_max.unwrap_or(0),
        }
    }

    fn width(&self) -> usize {
        let range = (self.max as i128 - self.min as i128).max(0) as u64;
        ceil_log2(range + 2)
    }
}

impl FieldCodec for IntCodec<'_> {
    fn min_size(&self) -> usize {
        self.width()
    }

    fn max_size(&self) -> usize {
        self.width()
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field.int_min.is_none() || self.field.int_max.is_none() {
            return Err(SchemaError::MissingParameter {
                field: self.field.name.clone(),
                what: "integer min/max bounds",
            });
        }
        let range = self.max as i128 - self.min as i128;
        if range < 0 || range as u128 >= MAX_RANGE as u128 {
            return Err(SchemaError::InvalidBounds {
                field: self.field.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let wire = match value.as_i64() {
            Some(v) if v >= self.min && v <= self.max => (v as i128 - self.min as i128) as u64 + 1,
            _ => 0,
        };
        let mut bits = BitBuffer::new();
        bits.push_bits(wire, self.width())?;
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        let wire = bits.consume_bits(self.width())?;
        Ok(match wire {
            0 => FieldValue::Absent,
            v => FieldValue::Int((v as i128 - 1 + self.min as i128) as i64),
        })
    }

    fn describe(&self) -> String {
        format!(
            "int [{}, {}]: {} bits",
            self.min,
            self.max,
            self.width()
        )
    }
}

/// Round `r` to `dec` decimal places with no upward bias: exact halves go
/// to the even neighbour.
pub(crate) fn unbiased_round(r: f64, dec: u32) -> f64 {
    let ex = 10f64.powi(dec as i32);
    let floor = (r * ex).floor();
    let s = r * ex - floor;
    if s < 0.5 || (s == 0.5 && (floor as i64) & 1 == 0) {
        floor / ex
    } else {
        (floor + 1.0) / ex
    }
}

/// Bounded float carrying `precision` decimal digits: scaled to an integer
/// by 10^precision and packed with the integer scheme.
pub struct FloatCodec<'d> {
    field: &'d FieldDescriptor,
    min: f64,
    max: f64,
    precision: u32,
}

impl<'d> FloatCodec<'d> {
    pub fn new(field: &'d FieldDescriptor) -> Self {
        Self {
            field,
            min: field.float_min.unwrap_or(0.0),
            max: field.float_max.unwrap_or(0.0),
            precision: field.precision.unwrap_or(0),
        }
    }

    fn scale(&self) -> f64 {
        10f64.powi(self.precision as i32)
    }

    /// Bounds scaled to integer steps of 10^-precision. Working in integer
    /// steps keeps decode exact: the wire value maps back to precisely the
    /// double nearest the intended decimal, independent of the bounds.
    fn scaled_min(&self) -> i64 {
        (self.min * self.scale()).round() as i64
    }

    fn scaled_max(&self) -> i64 {
        (self.max * self.scale()).round() as i64
    }

    fn scaled_range(&self) -> u64 {
        (self.scaled_max() as i128 - self.scaled_min() as i128).max(0) as u64
    }

    fn width(&self) -> usize {
        ceil_log2(self.scaled_range() + 2)
    }
}

impl FieldCodec for FloatCodec<'_> {
    fn min_size(&self) -> usize {
        self.width()
    }

    fn max_size(&self) -> usize {
        self.width()
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field.float_min.is_none()
            || self.field.float_max.is_none()
            || self.field.precision.is_none()
        {
            return Err(SchemaError::MissingParameter {
                field: self.field.name.clone(),
                what: "float min/max bounds and precision",
            });
        }
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(SchemaError::InvalidBounds {
                field: self.field.name.clone(),
                min: self.min as i64,
                max: self.max as i64,
            });
        }
        if self.scaled_range() >= MAX_RANGE {
            return Err(SchemaError::InvalidBounds {
                field: self.field.name.clone(),
                min: self.min as i64,
                max: self.max as i64,
            });
        }
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let wire = match value.as_f64() {
            Some(v) if v.is_finite() && v >= self.min && v <= self.max => {
                let rounded = unbiased_round(v, self.precision);
                let steps = (rounded * self.scale()).round() as i64 - self.scaled_min();
                (steps.clamp(0, self.scaled_range() as i64) as u64) + 1
            }
            _ => 0,
        };
        let mut bits = BitBuffer::new();
        bits.push_bits(wire, self.width())?;
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        let wire = bits.consume_bits(self.width())?;
        Ok(match wire {
            0 => FieldValue::Absent,
            v => {
                let steps = (v - 1) as i64 + self.scaled_min();
                FieldValue::Float(steps as f64 / self.scale())
            }
        })
    }

    fn describe(&self) -> String {
        format!(
            "float [{}, {}] @ {} decimal digits: {} bits",
            self.min,
            self.max,
            self.precision,
            self.width()
        )
    }
}

/// Boolean: two bits covering {absent, false, true}.
pub struct BoolCodec;

impl BoolCodec {
    pub fn new(_field: &FieldDescriptor) -> Self {
        Self
    }
}

impl FieldCodec for BoolCodec {
    fn min_size(&self) -> usize {
        2
    }

    fn max_size(&self) -> usize {
        2
    }

    fn validate(&self) -> SchemaResult<()> {
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let wire = match value.as_bool() {
            None => 0,
            Some(false) => 1,
            Some(true) => 2,
        };
        let mut bits = BitBuffer::new();
        bits.push_bits(wire, 2)?;
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        Ok(match bits.consume_bits(2)? {
            1 => FieldValue::Bool(false),
            2 => FieldValue::Bool(true),
            _ => FieldValue::Absent,
        })
    }

    fn describe(&self) -> String {
        "bool: 2 bits".to_owned()
    }
}

/// Enumeration over configured labels. Width = ceil(log2(count + 1)); wire
/// value is the label index plus one, zero reserved for absent. An
/// unknown label encodes as absent.
pub struct EnumCodec<'d> {
    field: &'d FieldDescriptor,
}

impl<'d> EnumCodec<'d> {
    pub fn new(field: &'d FieldDescriptor) -> Self {
        Self { field }
    }

    fn width(&self) -> usize {
        ceil_log2(self.field.labels.len() as u64 + 1)
    }
}

impl FieldCodec for EnumCodec<'_> {
    fn min_size(&self) -> usize {
        self.width()
    }

    fn max_size(&self) -> usize {
        self.width()
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field.labels.is_empty() {
            return Err(SchemaError::EmptyEnum {
                field: self.field.name.clone(),
            });
        }
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let wire = value
            .as_string()
            .and_then(|label| self.field.labels.iter().position(|l| *l == label))
            .map(|idx| idx as u64 + 1)
            .unwrap_or(0);
        let mut bits = BitBuffer::new();
        bits.push_bits(wire, self.width())?;
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        let wire = bits.consume_bits(self.width())? as usize;
        Ok(match wire {
            0 => FieldValue::Absent,
            idx if idx <= self.field.labels.len() => {
                FieldValue::String(self.field.labels[idx - 1].clone())
            }
            _ => FieldValue::Absent, // tag beyond the label table
        })
    }

    fn describe(&self) -> String {
        format!(
            "enum {{{}}}: {} bits",
            self.field.labels.join(", "),
            self.width()
        )
    }
}
