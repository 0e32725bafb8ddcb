//! Trigger evaluation.
//!
//! Decides *which* loaded messages are due for encoding; the surrounding
//! middleware decides what to do about it. Two rules exist: publish
//! triggers fire on an external variable publish (optionally gated on a
//! mandatory substring of the publish content), and time triggers fire on
//! elapsed wall-clock time. Results come back as ordered ID sets so the
//! caller's send order is deterministic.

use std::collections::BTreeSet;

use tracing::debug;

use crate::registry::Registry;
use crate::schema::TriggerRule;

/// IDs of messages due because `variable` was published with `content`.
pub fn publish_triggers(registry: &Registry, variable: &str, content: &str) -> BTreeSet<u32> {
    let mut due = BTreeSet::new();
    for message in registry.messages() {
        let TriggerRule::OnPublish {
            variable: trigger_var,
            mandatory_content,
        } = &message.trigger
        else {
            continue;
        };
        if trigger_var != variable {
            continue;
        }
        if let Some(mandatory) = mandatory_content {
            if !content.contains(mandatory.as_str()) {
                continue;
            }
        }
        debug!(message = %message.name, variable, "publish trigger fired");
        due.insert(message.id);
    }
    due
}

/// IDs of messages due on elapsed time, bumping each fired message's
/// counter.
///
/// A message with interval T is due whenever `elapsed > (fire_count + 1) * T`,
/// and each call fires it at most once; a message that fell several
/// intervals behind catches up across successive calls rather than
/// bursting.
pub fn time_triggers(registry: &mut Registry, elapsed_secs: f64) -> BTreeSet<u32> {
    let mut due = BTreeSet::new();
    for message in registry.messages_mut() {
        let TriggerRule::OnTime { interval_secs } = &message.trigger else {
            continue;
        };
        let threshold = (message.fire_count + 1) as f64 * *interval_secs as f64;
        if elapsed_secs > threshold {
            message.fire_count += 1;
            debug!(
                message = %message.name,
                elapsed_secs,
                fire_count = message.fire_count,
                "time trigger fired"
            );
            due.insert(message.id);
        }
    }
    due
}

/// ID of the message routed inbound on `variable`, if any is configured.
pub fn incoming_message(registry: &Registry, variable: &str) -> Option<u32> {
    registry
        .messages()
        .find(|m| m.in_var.as_deref() == Some(variable))
        .map(|m| m.id)
}
