//! Animation commands and the batches they travel in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gesture length used when a command does not say otherwise.
pub const DEFAULT_GESTURE_DURATION_MS: u64 = 1400;

/// A directive instructing one avatar entity to change its visual state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnimationCommand {
    /// Identifier of the avatar entity in the viewer's scene.
    pub target: String,
    /// Delay before the command takes effect once applied.
    #[serde(default)]
    pub start_offset_ms: u64,
    #[serde(flatten)]
    pub kind: CommandKind,
}

/// The closed set of command kinds, tagged by `type` on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum CommandKind {
    Idle,
    Speak {
        #[serde(default)]
        visemes: Vec<Viseme>,
        #[serde(default, skip_serializing_if = "Option::is_none", alias = "audioUrl")]
        audio_ref: Option<String>,
    },
    Gesture {
        name: String,
        #[serde(default = "default_gesture_duration", alias = "duration")]
        duration_ms: u64,
    },
    Emotion {
        emotion: String,
        #[serde(default)]
        intensity: f32,
    },
}

fn default_gesture_duration() -> u64 {
    DEFAULT_GESTURE_DURATION_MS
}

/// A timed mouth-shape cue, relative to the start of speech.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Viseme {
    pub phoneme: String,
    #[serde(default, alias = "t")]
    pub offset_ms: u64,
}

impl Viseme {
    pub fn new(phoneme: impl Into<String>, offset_ms: u64) -> Self {
        Self {
            phoneme: phoneme.into(),
            offset_ms,
        }
    }
}

impl AnimationCommand {
    pub fn new(target: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            target: target.into(),
            start_offset_ms: 0,
            kind,
        }
    }

    pub fn idle(target: impl Into<String>) -> Self {
        Self::new(target, CommandKind::Idle)
    }

    pub fn speak(target: impl Into<String>, visemes: Vec<Viseme>) -> Self {
        Self::new(
            target,
            CommandKind::Speak {
                visemes,
                audio_ref: None,
            },
        )
    }

    pub fn gesture(target: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            target,
            CommandKind::Gesture {
                name: name.into(),
                duration_ms: DEFAULT_GESTURE_DURATION_MS,
            },
        )
    }

    pub fn emotion(target: impl Into<String>, emotion: impl Into<String>, intensity: f32) -> Self {
        Self::new(
            target,
            CommandKind::Emotion {
                emotion: emotion.into(),
                intensity: intensity.clamp(0.0, 1.0),
            },
        )
    }

    pub fn with_start_offset(mut self, offset_ms: u64) -> Self {
        self.start_offset_ms = offset_ms;
        self
    }

    /// Short label of the command kind, for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            CommandKind::Idle => "idle",
            CommandKind::Speak { .. } => "speak",
            CommandKind::Gesture { .. } => "gesture",
            CommandKind::Emotion { .. } => "emotion",
        }
    }
}

/// Where a batch came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_event_id: String,
    /// Stamped at publish time; absent on freshly generated batches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// An ordered group of commands produced from one event.
///
/// The order of `commands` is the order in which viewers apply them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandBatch {
    pub commands: Vec<AnimationCommand>,
    pub provenance: Provenance,
}

impl CommandBatch {
    /// Records the publish instant on the batch.
    pub fn stamp(mut self, at: DateTime<Utc>) -> Self {
        self.provenance.generated_at = Some(at);
        self
    }
}
