//! Reconstructed, typed sample events.

use serde_json::{Map, Value};

use crate::domain::foundation::{DomainId, Timestamp};

use super::category::{Category, TopicKind};
use super::record::RecordHeader;

/// UI-friendly aliases exposed alongside the original field names.
const AIRCRAFT_ALIASES: &[(&str, &str)] = &[
    ("speed_mps", "speed"),
    ("orientation_degrees", "heading"),
];

const INTELLIGENCE_ALIASES: &[(&str, &str)] = &[
    ("vs_battery_percentage", "battery"),
    ("vs_signal_strength_dbm", "signal_strength"),
    ("td_confidence_level", "confidence"),
];

const MESSAGING_ALIASES: &[(&str, &str)] = &[
    ("sr_header_sender_id", "sender_id"),
    ("message_type", "type"),
];

/// One fully reconstructed sample, tagged with the header that governed it.
///
/// Immutable once built; the hub only holds it for the duration of one
/// broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    pub domain: DomainId,
    pub topic: TopicKind,
    pub fields: Map<String, Value>,
    pub received_at: Timestamp,
}

impl SampleEvent {
    /// Combines a decoded field map with the governing header.
    ///
    /// Aliases are appended after the decoded fields and never replace a key
    /// that is already present.
    pub fn assemble(header: RecordHeader, mut fields: Map<String, Value>, received_at: Timestamp) -> Self {
        for (original, alias) in aliases_for(header.topic.category()) {
            if fields.contains_key(*alias) {
                continue;
            }
            if let Some(value) = fields.get(*original).cloned() {
                fields.insert((*alias).to_string(), value);
            }
        }

        Self {
            domain: header.domain,
            topic: header.topic,
            fields,
            received_at,
        }
    }

    pub fn category(&self) -> Category {
        self.topic.category()
    }

    pub fn subtype(&self) -> Option<&'static str> {
        self.topic.subtype()
    }

    /// Viewer channel name for this event.
    pub fn channel(&self) -> &'static str {
        self.category().channel()
    }

    /// Viewer payload: decoded fields plus identity and `received_at`.
    ///
    /// Like the aliases, metadata never replaces a decoded field of the same name.
    pub fn payload(&self) -> Value {
        let mut data = self.fields.clone();
        let mut metadata = Vec::with_capacity(4);
        if let TopicKind::Aircraft(source) = self.topic {
            metadata.push(("id", Value::from(source.aircraft_id())));
            metadata.push(("source", Value::from(source.subtype())));
        }
        metadata.push(("domain", Value::from(self.domain.value())));
        metadata.push(("received_at", Value::from(self.received_at.to_rfc3339())));
        for (key, value) in metadata {
            data.entry(key).or_insert(value);
        }
        Value::Object(data)
    }
}

fn aliases_for(category: Category) -> &'static [(&'static str, &'static str)] {
    match category {
        Category::Aircraft => AIRCRAFT_ALIASES,
        Category::Intelligence => INTELLIGENCE_ALIASES,
        Category::Messaging => MESSAGING_ALIASES,
    }
}
