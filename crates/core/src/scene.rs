//! The seam between the command pipeline and the external 3D scene engine.
//!
//! A [`Scene`] owns the avatar entities: their clips, skeletons, audio and
//! transform animations. The pipeline only ever reaches the entities through
//! this trait, addressing them by target identifier.

use crate::error::SceneError;
use serde::{Deserialize, Serialize};

/// Name of the canonical resting clip.
pub const IDLE_CLIP: &str = "idle";

/// Handle to a joint within one entity's skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointId(pub usize);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// How a clip should be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Loop,
    Once,
}

/// A short supplementary transform animation layered over the current pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modifier {
    /// Rotate the whole entity around its vertical axis and ease back.
    Turn { yaw_degrees: f32, duration_ms: u64 },
    /// Tilt the whole entity forward and ease back.
    Lean { pitch_degrees: f32, duration_ms: u64 },
    /// Lift the entity and drop it back down.
    Bounce { height: f32, duration_ms: u64 },
}

/// The minimal reaction shown when nothing better is available.
pub const GENERIC_TURN: Modifier = Modifier::Turn {
    yaw_degrees: 14.0,
    duration_ms: 400,
};

/// Looks up the visual modifier for an emotion label.
pub fn emotion_modifier(label: &str) -> Option<Modifier> {
    match label {
        "remorseful" | "sad" | "caring" => Some(Modifier::Turn {
            yaw_degrees: 6.0,
            duration_ms: 600,
        }),
        "joyful" | "happy" => Some(Modifier::Bounce {
            height: 0.05,
            duration_ms: 400,
        }),
        "firm" => Some(Modifier::Lean {
            pitch_degrees: 4.0,
            duration_ms: 300,
        }),
        _ => None,
    }
}

/// Operations the pipeline needs from a scene engine.
#[cfg_attr(test, mockall::automock)]
pub trait Scene {
    /// Whether `target` names an entity in the scene.
    fn has_entity(&self, target: &str) -> bool;

    /// Asks the engine to report when `target`'s asset has loaded.
    fn subscribe_ready(&mut self, target: &str);

    /// Names of the motion clips on `target`'s loaded asset.
    fn clip_names(&self, target: &str) -> Vec<String>;

    fn play_clip(&mut self, target: &str, clip: &str, mode: PlayMode);

    /// Resolves a joint by its exact node name.
    fn find_joint(&self, target: &str, name: &str) -> Result<Option<JointId>, SceneError>;

    /// Current rotation of a joint on one axis, in radians.
    fn joint_rotation(&self, target: &str, joint: JointId, axis: Axis) -> Result<f32, SceneError>;

    fn set_joint_rotation(
        &mut self,
        target: &str,
        joint: JointId,
        axis: Axis,
        radians: f32,
    ) -> Result<(), SceneError>;

    fn apply_modifier(&mut self, target: &str, modifier: Modifier);

    /// Shows a mouth shape on the entity.
    fn mouth_cue_on(&mut self, target: &str, phoneme: &str);

    /// Reverts a mouth shape previously shown.
    fn mouth_cue_off(&mut self, target: &str, phoneme: &str);

    fn play_audio(&mut self, target: &str, audio_ref: &str);
}
