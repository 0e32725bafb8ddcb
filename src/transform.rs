//! Value transform pipeline ("algorithms").
//!
//! Named, registered value-rewriting functions applied per array element
//! strictly before bit-packing. A transform sees the value it may rewrite,
//! the element's index within its array, and the complete current value map
//! of the message, so it can substitute values derived from sibling fields
//! (the usual delta-against-key trick for array elements).
//!
//! The pipeline is encode-only by design: decode trusts the raw decoded
//! scalar and does not re-invert named transforms. Transforms are
//! precomputation aids for the encoder, not information the decoder can
//! reconstruct; registering a transform whose output is not recoverable
//! from the key element alone therefore breaks round-tripping for that
//! field, and that is the registrant's responsibility, not the codec's.
//!
//! The registry is an explicitly constructed object owned by the codec
//! session. Register once, use by name; unknown names fail at
//! schema-validation time, never at encode time.

use crate::value::{FieldValue, ValueMap};
use crate::{SchemaError, SchemaResult};
use std::collections::HashMap;

/// Transform function: `(value, index-within-array, all-current-values)`.
pub type TransformFn = Box<dyn Fn(&mut FieldValue, usize, &ValueMap) + Send + Sync>;

/// Session-owned name → transform table.
#[derive(Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut FieldValue, usize, &ValueMap) + Send + Sync + 'static,
    {
        self.transforms.insert(name.to_owned(), Box::new(func));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Schema-time check that a field's transform list is fully resolvable.
    pub fn check(&self, message: &str, field: &str, names: &[String]) -> SchemaResult<()> {
        for name in names {
            if !self.contains(name) {
                return Err(SchemaError::UnknownTransform {
                    message: message.to_owned(),
                    field: field.to_owned(),
                    transform: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Apply one named transform in place. Unknown names are a no-op here;
    /// they were already rejected when the schema loaded.
    pub fn apply(&self, name: &str, value: &mut FieldValue, index: usize, vals: &ValueMap) {
        if let Some(func) = self.transforms.get(name) {
            func(value, index, vals);
        }
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}
