//! Nested message field codec.
//!
//! A nested field carries its own ordered subfields, encoded recursively
//! through the same closed dispatch as top-level fields. Subfields are
//! written in declaration order, each padded to its declared slot count, so
//! a nested element's size is the plain sum of its subfield sizes.
//! Key-frame reordering and the transform pipeline operate at the top
//! level only; inside a nested element the layout is positional.
//!
//! The element value is a [`FieldValue::List`] with one entry per subfield;
//! an array subfield's entry is itself a list. Missing entries encode as
//! absent.

use super::{codec_for, validate_field, FieldCodec};
use crate::buffer::BitBuffer;
use crate::schema::FieldDescriptor;
use crate::value::FieldValue;
use crate::{Result, SchemaError, SchemaResult};

pub struct NestedCodec<'d> {
    field: &'d FieldDescriptor,
}

impl<'d> NestedCodec<'d> {
    pub fn new(field: &'d FieldDescriptor) -> Self {
        Self { field }
    }

    /// Entry for subfield `idx`, widened to that subfield's slot count.
    fn entry_values(entry: Option<&FieldValue>, slots: usize) -> Vec<FieldValue> {
        let mut values = match entry {
            Some(FieldValue::List(list)) => list.clone(),
            Some(FieldValue::Absent) | None => Vec::new(),
            Some(scalar) => vec![scalar.clone()],
        };
        values.resize(slots, FieldValue::Absent);
        values
    }
}

impl FieldCodec for NestedCodec<'_> {
    fn min_size(&self) -> usize {
        self.field
            .subfields
            .iter()
            .map(|sub| codec_for(sub).min_size() * sub.array_length)
            .sum()
    }

    fn max_size(&self) -> usize {
        self.field
            .subfields
            .iter()
            .map(|sub| codec_for(sub).max_size() * sub.array_length)
            .sum()
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.field.subfields.is_empty() {
            return Err(SchemaError::MissingParameter {
                field: self.field.name.clone(),
                what: "nested subfields",
            });
        }
        for sub in &self.field.subfields {
            validate_field(sub)?;
        }
        Ok(())
    }

    fn encode(&self, value: &FieldValue) -> Result<BitBuffer> {
        let entries = match value {
            FieldValue::List(list) => list.as_slice(),
            _ => &[],
        };

        let mut bits = BitBuffer::new();
        for (idx, sub) in self.field.subfields.iter().enumerate() {
            let codec = codec_for(sub);
            for element in Self::entry_values(entries.get(idx), sub.array_length) {
                bits.append(codec.encode(&element)?);
            }
        }
        Ok(bits)
    }

    fn decode(&self, bits: &mut BitBuffer) -> Result<FieldValue> {
        let mut entries = Vec::with_capacity(self.field.subfields.len());
        for sub in &self.field.subfields {
            let codec = codec_for(sub);
            let mut values = Vec::with_capacity(sub.array_length);
            for _ in 0..sub.array_length {
                values.push(codec.decode(bits)?);
            }
            if sub.array_length == 1 {
                entries.push(values.remove(0));
            } else {
                entries.push(FieldValue::List(values));
            }
        }
        Ok(FieldValue::List(entries))
    }

    fn describe(&self) -> String {
        let subs: Vec<String> = self
            .field
            .subfields
            .iter()
            .map(|sub| format!("{}: {}", sub.name, codec_for(sub).describe()))
            .collect();
        format!(
            "nested {{{}}}: {}..{} bits",
            subs.join("; "),
            self.min_size(),
            self.max_size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_field() -> FieldDescriptor {
        FieldDescriptor::nested(
            "position",
            vec![
                FieldDescriptor::float("lat", -90.0, 90.0, 2),
                FieldDescriptor::float("lon", -180.0, 180.0, 2),
                FieldDescriptor::int("depth", 0, 6000),
            ],
        )
    }

    #[test]
    fn test_nested_size_is_sum_of_subfields() {
        let field = position_field();
        let codec = codec_for(&field);
        let expected: usize = field
            .subfields
            .iter()
            .map(|sub| codec_for(sub).max_size())
            .sum();
        assert_eq!(codec.max_size(), expected);
        assert!(!codec.is_variable_size());
    }

    #[test]
    fn test_nested_roundtrip() {
        let field = position_field();
        let codec = codec_for(&field);

        let value = FieldValue::List(vec![
            FieldValue::Float(42.35),
            FieldValue::Float(-70.95),
            FieldValue::Int(110),
        ]);
        let mut bits = codec.encode(&value).unwrap();
        assert_eq!(bits.len(), codec.max_size());
        assert_eq!(codec.decode(&mut bits).unwrap(), value);
    }

    #[test]
    fn test_nested_missing_entries_decode_absent() {
        let field = position_field();
        let codec = codec_for(&field);

        let value = FieldValue::List(vec![FieldValue::Float(10.0)]);
        let mut bits = codec.encode(&value).unwrap();
        assert_eq!(
            codec.decode(&mut bits).unwrap(),
            FieldValue::List(vec![
                FieldValue::Float(10.0),
                FieldValue::Absent,
                FieldValue::Absent,
            ])
        );
    }

    #[test]
    fn test_nested_with_array_subfield() {
        let field = FieldDescriptor::nested(
            "scan",
            vec![
                FieldDescriptor::int("beam", 0, 255),
                FieldDescriptor::int("ranges", 0, 1000).with_array_length(3),
            ],
        );
        let codec = codec_for(&field);

        let value = FieldValue::List(vec![
            FieldValue::Int(7),
            FieldValue::List(vec![
                FieldValue::Int(10),
                FieldValue::Int(20),
                FieldValue::Int(30),
            ]),
        ]);
        let mut bits = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&mut bits).unwrap(), value);
    }

    #[test]
    fn test_nested_without_subfields_rejected() {
        let field = FieldDescriptor::nested("empty", vec![]);
        let err = codec_for(&field).validate().unwrap_err();
        assert!(matches!(err, SchemaError::MissingParameter { .. }));
    }

    #[test]
    fn test_variable_size_string_inside_nested() {
        let field = FieldDescriptor::nested(
            "note",
            vec![
                FieldDescriptor::int("priority", 0, 3),
                FieldDescriptor::string("text", 8),
            ],
        );
        let codec = codec_for(&field);
        assert!(codec.is_variable_size());

        let value = FieldValue::List(vec![
            FieldValue::Int(2),
            FieldValue::String("dive".into()),
        ]);
        let mut bits = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&mut bits).unwrap(), value);
    }
}
