//! Messages on the `/anim` command batch stream.

use crate::{
    command::{AnimationCommand, CommandBatch},
    error::WireError,
    event::Event,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One pushed message: a batch plus the event it was generated from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnimMessage {
    #[serde(flatten)]
    pub batch: CommandBatch,
    pub original: Event,
}

impl AnimMessage {
    pub fn new(batch: CommandBatch, original: Event) -> Self {
        Self { batch, original }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Extracts the commands of a pushed message.
///
/// Accepts `{"commands": [..]}`, a single object under `commands`, or a
/// single object under `command`. Elements that do not decode as a command
/// are logged and skipped; the rest of the message still applies.
pub fn decode_commands(text: &str) -> Result<Vec<AnimationCommand>, WireError> {
    let value: Value = serde_json::from_str(text)?;

    let items = match (value.get("commands"), value.get("command")) {
        (Some(Value::Array(items)), _) => items.clone(),
        (Some(item @ Value::Object(_)), _) | (None, Some(item @ Value::Object(_))) => {
            vec![item.clone()]
        }
        _ => return Err(WireError::NoCommands),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(cmd) => Some(cmd),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed animation command");
                None
            }
        })
        .collect())
}
