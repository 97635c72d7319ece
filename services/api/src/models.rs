//! API Models
//!
//! Request and response bodies of the HTTP API, with `utoipa` schemas for the
//! OpenAPI document.

use animus_core::AnimMessage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shape of a submitted event. Every field is optional and unknown fields
/// are ignored; a body that is not a JSON object counts as an empty event.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[schema(example = "hello there")]
    pub text: Option<String>,
    #[schema(example = "playful")]
    pub personality: Option<String>,
    #[schema(example = json!(["set-boundary"]))]
    pub event_tags: Option<Vec<String>>,
    pub system_context: Option<String>,
    #[schema(example = "realtime")]
    pub source_id: Option<String>,
}

/// The published batch with its delivery report.
#[derive(Serialize, ToSchema, Debug)]
pub struct IngressResponse {
    /// The batch as pushed to viewers: `commands`, `provenance` and the
    /// `original` event.
    #[schema(value_type = Object)]
    pub anim: AnimMessage,
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub viewers: usize,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use animus_core::{AnimationCommand, CommandBatch, Event, Provenance};
    use serde_json::json;

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Realtime relay is not configured".to_string(),
        };

        let json = serde_json::to_string(&error).unwrap();
        let expected = r#"{"message":"Realtime relay is not configured"}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_ingress_response_shape() {
        let response = IngressResponse {
            anim: AnimMessage::new(
                CommandBatch {
                    commands: vec![AnimationCommand::idle("avatar-1")],
                    provenance: Provenance {
                        source_event_id: "anonymous".to_string(),
                        generated_at: None,
                    },
                },
                Event::default(),
            ),
            delivered: 2,
            dropped: 1,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "anim": {
                    "commands": [{ "target": "avatar-1", "startOffsetMs": 0, "type": "idle" }],
                    "provenance": { "sourceEventId": "anonymous" },
                    "original": {}
                },
                "delivered": 2,
                "dropped": 1
            })
        );
    }

    #[test]
    fn test_health_response_deserialization() {
        let health: HealthResponse =
            serde_json::from_str(r#"{"status":"ok","viewers":3}"#).unwrap();
        assert_eq!(
            health,
            HealthResponse {
                status: "ok".to_string(),
                viewers: 3
            }
        );
    }
}
