//! # Codec Session
//!
//! ## Purpose
//!
//! The top-level session object tying the pieces together: schema registry,
//! transform registry, crypto context, and the node identity/start time the
//! header and trigger machinery need. One [`Codec`] per link endpoint;
//! everything it owns is explicit state, so two sessions in one process
//! never interfere.
//!
//! ## Encode Path
//!
//! ```text
//! ValueMap ──fill header defaults──► fixed header (10 bytes)
//!          ──header-region fields──► head section (plaintext, fixed size)
//!          ──body fields──────────► body bits ──cipher──► body bytes
//!                                            └── nonce = hash(prefix)
//! hex(header ++ head ++ body) ──► wire text
//! ```
//!
//! Fields are spliced onto the front of the bit stream in declaration
//! order, so the decoder walks them in reverse declaration order. Decode
//! undoes each step exactly, tolerating the trailing NUL padding acoustic
//! modems add to fixed-size frames.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use zerocopy::AsBytes;

use crate::buffer::BitBuffer;
use crate::crypto::CryptoContext;
use crate::field::{codec_for, decode_field, encode_field, field_max_bits, field_min_bits};
use crate::header::{MessageHeader, HEADER_SIZE, HEAD_DEST_ID, HEAD_SRC_ID, HEAD_TIME};
use crate::registry::Registry;
use crate::schema::{MessageDescriptor, TriggerRule};
use crate::transform::TransformRegistry;
use crate::trigger;
use crate::value::{explode, val_from_string, FieldValue, ValueMap};
use crate::{CodecError, LookupError, Result, SchemaResult};

/// Message selection by name or numeric ID. Most call sites pass a `&str`
/// or `u32` directly through the `From` impls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    Name(&'a str),
    Id(u32),
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(name: &'a str) -> Self {
        Selector::Name(name)
    }
}

impl From<u32> for Selector<'_> {
    fn from(id: u32) -> Self {
        Selector::Id(id)
    }
}

/// One codec session: loaded schemas, registered transforms, optional
/// encryption, node identity.
#[derive(Debug)]
pub struct Codec {
    registry: Registry,
    transforms: TransformRegistry,
    crypto: CryptoContext,
    node_id: u16,
    start_time: SystemTime,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            transforms: TransformRegistry::new(),
            crypto: CryptoContext::new(),
            node_id: 0,
            start_time: SystemTime::now(),
        }
    }

    /// Node ID stamped as the source of every encoded message.
    pub fn set_node_id(&mut self, node_id: u16) {
        self.node_id = node_id;
    }

    /// Enable body encryption with a shared passphrase; empty disables.
    pub fn set_passphrase(&mut self, passphrase: &str) {
        self.crypto.set_passphrase(passphrase);
    }

    /// Register a named transform. Must happen before loading any schema
    /// that references it.
    pub fn register_transform<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut FieldValue, usize, &ValueMap) + Send + Sync + 'static,
    {
        self.transforms.register(name, func);
    }

    /// Validate and load message schemas, returning the newly loaded IDs.
    pub fn load(&mut self, descriptors: Vec<MessageDescriptor>) -> SchemaResult<BTreeSet<u32>> {
        self.registry.load(descriptors, &self.transforms)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Session start; the zero point for time-trigger schedules.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    fn resolve(&self, which: Selector<'_>) -> std::result::Result<&MessageDescriptor, LookupError> {
        match which {
            Selector::Name(name) => self.registry.by_name(name),
            Selector::Id(id) => self.registry.by_id(id),
        }
    }

    /// Encode one message to hex wire text.
    ///
    /// Values missing from `vals` (including the reserved header keys)
    /// fall back to their defaults: absent for body fields, wall clock /
    /// node ID / schema destination for the header.
    pub fn encode<'a, S: Into<Selector<'a>>>(&self, which: S, vals: &ValueMap) -> Result<String> {
        let message = self.resolve(which.into())?;
        let mut vals = vals.clone();
        self.fill_head_defaults(message, &mut vals);

        let header = MessageHeader::new(
            message.id as u16,
            head_u32(&vals, HEAD_TIME),
            head_u16(&vals, HEAD_SRC_ID),
            head_u16(&vals, HEAD_DEST_ID),
        );

        let mut head_stream = BitBuffer::new();
        for field in message.header_fields() {
            encode_field(field, &self.transforms, &vals, &mut head_stream)?;
        }
        let mut body_stream = BitBuffer::new();
        for field in message.body_fields() {
            encode_field(field, &self.transforms, &vals, &mut body_stream)?;
        }

        let mut wire = header.as_bytes().to_vec();
        wire.extend_from_slice(&head_stream.to_bytes());
        let mut body = body_stream.to_bytes();
        self.crypto.encrypt(&mut body, &wire);
        wire.extend_from_slice(&body);

        debug!(
            message = %message.name,
            id = message.id,
            bytes = wire.len(),
            encrypted = self.crypto.is_enabled(),
            "encoded message"
        );
        Ok(hex::encode(wire))
    }

    /// Decode hex wire text back into the message ID and its value map.
    ///
    /// The header always decodes (its reserved keys land in the map). A
    /// message with no body at all decodes every body field as absent; a
    /// body present but shorter than the schema requires is an error.
    pub fn decode(&self, wire: &str) -> Result<(u32, ValueMap)> {
        let raw = hex::decode(wire.trim())?;
        if raw.len() < HEADER_SIZE {
            return Err(CodecError::Truncated {
                need: HEADER_SIZE,
                got: raw.len(),
            });
        }
        let (header, rest) = MessageHeader::parse(&raw)?;
        let message = self.registry.by_id(u32::from(header.message_id()))?;

        let head_len = head_section_bytes(message);
        if rest.len() < head_len {
            return Err(CodecError::Truncated {
                need: HEADER_SIZE + head_len,
                got: raw.len(),
            });
        }
        let (head_bytes, body_bytes) = rest.split_at(head_len);

        // Acoustic modems pad frames with trailing NULs; strip them, but
        // never below the body's minimum size so legitimate zero bytes at
        // the tail survive.
        let min_body = body_min_bytes(message);
        let mut body = body_bytes.to_vec();
        while body.len() > min_body && body.last() == Some(&0) {
            body.pop();
        }
        self.crypto.decrypt(&mut body, &raw[..HEADER_SIZE + head_len]);

        let mut vals = ValueMap::new();
        header.fill_values(&mut vals);

        let mut head_stream = BitBuffer::from_bytes(head_bytes);
        let head_fields: Vec<_> = message.header_fields().collect();
        for field in head_fields.iter().rev() {
            vals.insert(field.name.clone(), decode_field(field, &mut head_stream)?);
        }

        let body_fields: Vec<_> = message.body_fields().collect();
        if body.is_empty() {
            for field in &body_fields {
                vals.insert(field.name.clone(), MessageDescriptor::default_values(field));
            }
        } else {
            let mut body_stream = BitBuffer::from_bytes(&body);
            for field in body_fields.iter().rev() {
                vals.insert(field.name.clone(), decode_field(field, &mut body_stream)?);
            }
        }

        debug!(
            message = %message.name,
            id = message.id,
            bytes = raw.len(),
            "decoded message"
        );
        Ok((message.id, vals))
    }

    /// Pull field values for one message out of a single publish event.
    ///
    /// Each field fed by `variable` takes its value from the `key=value`
    /// piece named by its source key (defaulting to the field name), or
    /// from the whole content when the publish carries a bare value.
    /// Comma-separated values fan out across array slots.
    pub fn gather<'a, S: Into<Selector<'a>>>(
        &self,
        which: S,
        variable: &str,
        content: &str,
    ) -> Result<ValueMap> {
        let message = self.resolve(which.into())?;
        let mut vals = ValueMap::new();
        for field in &message.fields {
            if field.source_var.as_deref() != Some(variable) {
                continue;
            }
            let key = field.source_key.as_deref().unwrap_or(&field.name);
            let text = match val_from_string(content, key) {
                Some(text) => text,
                None if !content.contains('=') => content.to_owned(),
                None => continue,
            };
            vals.insert(field.name.clone(), explode(&text));
        }
        Ok(vals)
    }

    /// IDs due because `variable` was published with `content`.
    pub fn publish_triggers(&self, variable: &str, content: &str) -> BTreeSet<u32> {
        trigger::publish_triggers(&self.registry, variable, content)
    }

    /// IDs due on elapsed time as of `now`, bumping fire counters.
    pub fn time_triggers(&mut self, now: SystemTime) -> BTreeSet<u32> {
        let elapsed = now
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_secs_f64();
        trigger::time_triggers(&mut self.registry, elapsed)
    }

    /// [`Codec::time_triggers`] against the current wall clock.
    pub fn time_triggers_now(&mut self) -> BTreeSet<u32> {
        self.time_triggers(SystemTime::now())
    }

    /// ID of the message routed inbound on `variable`, if any.
    pub fn incoming_message(&self, variable: &str) -> Option<u32> {
        trigger::incoming_message(&self.registry, variable)
    }

    /// Multi-line report of every loaded message: trigger, per-field codec
    /// layout, size bounds.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for message in self.registry.messages() {
            out.push_str(&format!(
                "{} {{{}}}: {}\n",
                message.name,
                message.id,
                describe_trigger(&message.trigger)
            ));
            for field in &message.fields {
                let region = if field.in_header { "head" } else { "body" };
                out.push_str(&format!(
                    "  [{region}] {} ({}) x{}: {}\n",
                    field.name,
                    field.kind.as_str(),
                    field.array_length,
                    codec_for(field).describe()
                ));
            }
        }
        out
    }

    /// One line per loaded message.
    pub fn brief_summary(&self) -> String {
        self.registry
            .messages()
            .map(|message| {
                let min: usize = message.fields.iter().map(field_min_bits).sum();
                let max: usize = message.fields.iter().map(field_max_bits).sum();
                format!(
                    "{} {{{}}}: {} fields, {}..{} payload bits",
                    message.name,
                    message.id,
                    message.fields.len(),
                    min,
                    max
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn fill_head_defaults(&self, message: &MessageDescriptor, vals: &mut ValueMap) {
        if !vals.contains_key(HEAD_TIME) {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            vals.insert(HEAD_TIME.to_owned(), vec![FieldValue::Int(now as i64)]);
        }
        if !vals.contains_key(HEAD_SRC_ID) {
            vals.insert(
                HEAD_SRC_ID.to_owned(),
                vec![FieldValue::Int(i64::from(self.node_id))],
            );
        }
        if !vals.contains_key(HEAD_DEST_ID) {
            let dest = message.dest_default.unwrap_or(0);
            vals.insert(
                HEAD_DEST_ID.to_owned(),
                vec![FieldValue::Int(i64::from(dest))],
            );
        }
    }
}

fn head_u16(vals: &ValueMap, key: &str) -> u16 {
    vals.get(key)
        .and_then(|v| v.first())
        .and_then(FieldValue::as_i64)
        .map(|n| n.clamp(0, i64::from(u16::MAX)) as u16)
        .unwrap_or(0)
}

fn head_u32(vals: &ValueMap, key: &str) -> u32 {
    vals.get(key)
        .and_then(|v| v.first())
        .and_then(FieldValue::as_i64)
        .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Byte width of the head section. Header-region fields are fixed-size
/// (enforced at validation), so this is exact, not a bound.
fn head_section_bytes(message: &MessageDescriptor) -> usize {
    message
        .header_fields()
        .map(field_max_bits)
        .sum::<usize>()
        .div_ceil(8)
}

fn body_min_bytes(message: &MessageDescriptor) -> usize {
    message
        .body_fields()
        .map(field_min_bits)
        .sum::<usize>()
        .div_ceil(8)
}

fn describe_trigger(trigger: &TriggerRule) -> String {
    match trigger {
        TriggerRule::OnPublish {
            variable,
            mandatory_content: None,
        } => format!("on publish of '{variable}'"),
        TriggerRule::OnPublish {
            variable,
            mandatory_content: Some(mandatory),
        } => format!("on publish of '{variable}' containing '{mandatory}'"),
        TriggerRule::OnTime { interval_secs } => format!("every {interval_secs}s"),
    }
}
