//! Semantic events that drive the avatar.
//!
//! Events arrive from the control UI or the speech relay as loosely shaped
//! JSON. [`Event::from_value`] never fails: fields with the wrong type are
//! ignored one by one, and anything that is not an object becomes an empty
//! event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single semantic event, immutable once received.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Transcript or utterance text the avatar should respond to.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "transcript")]
    pub text: Option<String>,
    /// Personality hint set by the therapist, e.g. "playful".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    /// Conversational intents detected upstream.
    #[serde(default, skip_serializing_if = "Vec::is_empty", alias = "events")]
    pub event_tags: Vec<String>,
    /// Therapist-authored context. Carried for observability only.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "systemPrompt")]
    pub system_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "source")]
    pub source_id: Option<String>,
}

impl Event {
    /// Builds an event from an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let string_field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| obj.get(*name).and_then(Value::as_str))
                .map(str::to_owned)
        };

        let event_tags = ["eventTags", "events"]
            .iter()
            .find_map(|name| obj.get(*name))
            .map(|tags| match tags {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect(),
                Value::String(tag) => vec![tag.clone()],
                _ => Vec::new(),
            })
            .unwrap_or_default();

        Self {
            text: string_field(&["text", "transcript"]),
            personality: string_field(&["personality"]),
            event_tags,
            system_context: string_field(&["systemContext", "systemPrompt"]),
            source_id: string_field(&["sourceId", "source"]),
        }
    }

    /// Builds an event from a raw request body. Bodies that are not JSON
    /// are treated as an empty event.
    pub fn from_bytes(body: &[u8]) -> Self {
        serde_json::from_slice::<Value>(body)
            .map(|value| Self::from_value(&value))
            .unwrap_or_default()
    }

    /// The text with surrounding whitespace removed, if any remains.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}
