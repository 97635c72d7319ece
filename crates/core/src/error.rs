use thiserror::Error;

/// Failures reported by a scene engine while manipulating an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("Entity '{0}' is not in the scene")]
    UnknownEntity(String),
    #[error("Joint {joint} on entity '{target}' is not addressable: {reason}")]
    Joint {
        target: String,
        joint: usize,
        reason: String,
    },
}

/// Failures decoding a message pushed on the command batch stream.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Message carries no `commands` or `command` field")]
    NoCommands,
}
