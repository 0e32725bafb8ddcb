//! Message registry.
//!
//! Owns every loaded [`MessageDescriptor`] and resolves lookups by name or
//! numeric ID in O(1). Loading validates each descriptor against the whole
//! registry (IDs and names must be unique across all prior loads, not just
//! within one batch); a rejected load leaves previously loaded messages
//! untouched.

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use crate::field::validate_field;
use crate::schema::{FieldDescriptor, MessageDescriptor, TriggerRule};
use crate::transform::TransformRegistry;
use crate::{LookupError, SchemaError, SchemaResult, MAX_MESSAGE_ID};

#[derive(Debug, Default)]
pub struct Registry {
    messages: Vec<MessageDescriptor>,
    name_index: HashMap<String, usize>,
    id_index: HashMap<u32, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a batch of descriptors, returning the set of
    /// newly loaded IDs. Descriptors are checked one at a time; on error the
    /// offending descriptor and the rest of the batch are discarded, but
    /// everything loaded before it stays.
    pub fn load(
        &mut self,
        descriptors: Vec<MessageDescriptor>,
        transforms: &TransformRegistry,
    ) -> SchemaResult<BTreeSet<u32>> {
        let mut loaded = BTreeSet::new();
        for mut message in descriptors {
            self.validate(&message, transforms)?;
            default_source_vars(&mut message);

            info!(
                message = %message.name,
                id = message.id,
                fields = message.fields.len(),
                "loaded message schema"
            );
            let slot = self.messages.len();
            self.name_index.insert(message.name.clone(), slot);
            self.id_index.insert(message.id, slot);
            loaded.insert(message.id);
            self.messages.push(message);
        }
        Ok(loaded)
    }

    fn validate(
        &self,
        message: &MessageDescriptor,
        transforms: &TransformRegistry,
    ) -> SchemaResult<()> {
        if message.id > MAX_MESSAGE_ID {
            return Err(SchemaError::IdOutOfRange {
                name: message.name.clone(),
                id: message.id,
            });
        }
        if let Some(&slot) = self.id_index.get(&message.id) {
            return Err(SchemaError::DuplicateId {
                id: message.id,
                first: self.messages[slot].name.clone(),
                second: message.name.clone(),
            });
        }
        if self.name_index.contains_key(&message.name) {
            return Err(SchemaError::DuplicateName {
                name: message.name.clone(),
            });
        }
        for field in &message.fields {
            validate_field(field)?;
            transforms.check(&message.name, &field.name, &field.transforms)?;
        }
        Ok(())
    }

    pub fn by_name(&self, name: &str) -> Result<&MessageDescriptor, LookupError> {
        self.name_index
            .get(name)
            .map(|&slot| &self.messages[slot])
            .ok_or_else(|| LookupError::UnknownName(name.to_owned()))
    }

    pub fn by_id(&self, id: u32) -> Result<&MessageDescriptor, LookupError> {
        self.id_index
            .get(&id)
            .map(|&slot| &self.messages[slot])
            .ok_or(LookupError::UnknownId(id))
    }

    /// All loaded messages in load order.
    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.iter()
    }

    // Trigger bookkeeping needs to bump fire counters in place.
    pub(crate) fn messages_mut(&mut self) -> impl Iterator<Item = &mut MessageDescriptor> {
        self.messages.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.messages.iter().map(|m| m.id).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A publish-triggered message feeds fields from its trigger variable
/// unless a field names its own source.
fn default_source_vars(message: &mut MessageDescriptor) {
    if let TriggerRule::OnPublish { variable, .. } = &message.trigger {
        let variable = variable.clone();
        for field in &mut message.fields {
            apply_default_source(field, &variable);
        }
    }
}

fn apply_default_source(field: &mut FieldDescriptor, variable: &str) {
    if field.source_var.is_none() {
        field.source_var = Some(variable.to_owned());
    }
    for sub in &mut field.subfields {
        apply_default_source(sub, variable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    fn status_message(name: &str, id: u32) -> MessageDescriptor {
        MessageDescriptor::new(
            name,
            id,
            TriggerRule::OnTime { interval_secs: 30 },
            vec![FieldDescriptor::int("depth", 0, 5000)],
        )
    }

    #[test]
    fn test_load_and_lookup() {
        let mut registry = Registry::new();
        let transforms = TransformRegistry::new();
        let loaded = registry
            .load(
                vec![status_message("STATUS", 14), status_message("NAV", 15)],
                &transforms,
            )
            .unwrap();

        assert_eq!(loaded, BTreeSet::from([14, 15]));
        assert_eq!(registry.by_name("STATUS").unwrap().id, 14);
        assert_eq!(registry.by_id(15).unwrap().name, "NAV");
        assert_eq!(registry.names(), vec!["STATUS", "NAV"]);
    }

    #[test]
    fn test_lookup_errors() {
        let registry = Registry::new();
        assert_eq!(
            registry.by_name("GHOST").unwrap_err(),
            LookupError::UnknownName("GHOST".into())
        );
        assert_eq!(registry.by_id(99).unwrap_err(), LookupError::UnknownId(99));
    }

    #[test]
    fn test_duplicate_id_names_both_messages() {
        let mut registry = Registry::new();
        let transforms = TransformRegistry::new();
        registry
            .load(vec![status_message("STATUS", 14)], &transforms)
            .unwrap();

        let err = registry
            .load(vec![status_message("NAV", 14)], &transforms)
            .unwrap_err();
        match err {
            SchemaError::DuplicateId { id, first, second } => {
                assert_eq!(id, 14);
                assert_eq!(first, "STATUS");
                assert_eq!(second, "NAV");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The failed load must not disturb the original.
        assert_eq!(registry.len(), 1);
        assert!(registry.by_id(14).is_ok());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = Registry::new();
        let transforms = TransformRegistry::new();
        registry
            .load(vec![status_message("STATUS", 14)], &transforms)
            .unwrap();
        let err = registry
            .load(vec![status_message("STATUS", 20)], &transforms)
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { .. }));
    }

    #[test]
    fn test_id_out_of_range() {
        let mut registry = Registry::new();
        let transforms = TransformRegistry::new();
        let err = registry
            .load(
                vec![status_message("BIG", MAX_MESSAGE_ID + 1)],
                &transforms,
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::IdOutOfRange { .. }));
    }

    #[test]
    fn test_unknown_transform_rejected() {
        let mut registry = Registry::new();
        let transforms = TransformRegistry::new();
        let message = MessageDescriptor::new(
            "STATUS",
            14,
            TriggerRule::OnTime { interval_secs: 30 },
            vec![FieldDescriptor::int("depth", 0, 5000).with_transforms(&["meters_to_feet"])],
        );
        let err = registry.load(vec![message], &transforms).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTransform { .. }));
    }

    #[test]
    fn test_publish_trigger_defaults_source_var() {
        let mut registry = Registry::new();
        let transforms = TransformRegistry::new();
        let message = MessageDescriptor::new(
            "NAV",
            7,
            TriggerRule::on_publish("NAV_REPORT"),
            vec![
                FieldDescriptor::int("depth", 0, 5000),
                FieldDescriptor::int("battery", 0, 100).with_source("BATTERY_STATE"),
            ],
        );
        registry.load(vec![message], &transforms).unwrap();

        let nav = registry.by_name("NAV").unwrap();
        assert_eq!(nav.fields[0].source_var.as_deref(), Some("NAV_REPORT"));
        assert_eq!(nav.fields[1].source_var.as_deref(), Some("BATTERY_STATE"));
    }
}
