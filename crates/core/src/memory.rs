//! An in-memory scene engine.
//!
//! `MemoryScene` keeps entities as plain data and records every operation
//! the pipeline performs on them. The headless viewer renders with it, and
//! tests use it as a recording double.

use crate::{
    error::SceneError,
    scene::{Axis, JointId, Modifier, PlayMode, Scene},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, info};

/// Description of one avatar entity and its asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntity {
    pub id: String,
    #[serde(default)]
    pub clips: Vec<String>,
    /// Skeleton node names, in skeleton order.
    #[serde(default)]
    pub joints: Vec<String>,
    /// Time after scene start at which the asset reports itself loaded.
    #[serde(default)]
    pub load_delay_ms: u64,
    /// Simulates an asset whose skeleton cannot be read or written.
    #[serde(default)]
    pub broken_skeleton: bool,
    /// Simulates an asset whose joints can be read but not written.
    #[serde(default)]
    pub frozen_joints: bool,
    #[serde(skip)]
    loaded: bool,
}

impl MemoryEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            clips: Vec::new(),
            joints: Vec::new(),
            load_delay_ms: 0,
            broken_skeleton: false,
            frozen_joints: false,
            loaded: false,
        }
    }

    pub fn with_clips<I, S>(mut self, clips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clips = clips.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_joints<I, S>(mut self, joints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.joints = joints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_load_delay(mut self, delay_ms: u64) -> Self {
        self.load_delay_ms = delay_ms;
        self
    }

    pub fn with_broken_skeleton(mut self) -> Self {
        self.broken_skeleton = true;
        self
    }

    pub fn with_frozen_joints(mut self) -> Self {
        self.frozen_joints = true;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

/// A recorded scene operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOp {
    PlayClip {
        target: String,
        clip: String,
        mode: PlayMode,
    },
    SetJoint {
        target: String,
        joint: JointId,
        axis: Axis,
        radians: f32,
    },
    Modifier {
        target: String,
        modifier: Modifier,
    },
    CueOn {
        target: String,
        phoneme: String,
    },
    CueOff {
        target: String,
        phoneme: String,
    },
    Audio {
        target: String,
        audio_ref: String,
    },
}

#[derive(Debug, Default)]
pub struct MemoryScene {
    entities: Vec<MemoryEntity>,
    rotations: HashMap<(String, JointId), [f32; 3]>,
    ready_listeners: Vec<String>,
    ops: Vec<SceneOp>,
}

impl MemoryScene {
    pub fn new(entities: impl IntoIterator<Item = MemoryEntity>) -> Self {
        Self {
            entities: entities.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn entities(&self) -> &[MemoryEntity] {
        &self.entities
    }

    pub fn ops(&self) -> &[SceneOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SceneOp> {
        std::mem::take(&mut self.ops)
    }

    /// Targets a ready listener was registered for, in registration order.
    pub fn ready_listeners(&self) -> &[String] {
        &self.ready_listeners
    }

    /// Marks every asset whose load delay has elapsed as loaded and returns
    /// their ids. Each entity is reported exactly once.
    pub fn drain_loaded(&mut self, now: Duration) -> Vec<String> {
        let now_ms = now.as_millis();
        self.entities
            .iter_mut()
            .filter(|entity| !entity.loaded && u128::from(entity.load_delay_ms) <= now_ms)
            .map(|entity| {
                entity.loaded = true;
                info!(entity = %entity.id, "Asset loaded");
                entity.id.clone()
            })
            .collect()
    }

    fn entity(&self, target: &str) -> Result<&MemoryEntity, SceneError> {
        self.entities
            .iter()
            .find(|entity| entity.id == target)
            .ok_or_else(|| SceneError::UnknownEntity(target.to_string()))
    }

    fn checked_joint(
        &self,
        target: &str,
        joint: JointId,
        writing: bool,
    ) -> Result<(), SceneError> {
        let entity = self.entity(target)?;
        let reason = if joint.0 >= entity.joints.len() {
            Some("no such joint")
        } else if entity.broken_skeleton {
            Some("skeleton is unreadable")
        } else if writing && entity.frozen_joints {
            Some("joint is frozen")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(SceneError::Joint {
                target: target.to_string(),
                joint: joint.0,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Scene for MemoryScene {
    fn has_entity(&self, target: &str) -> bool {
        self.entity(target).is_ok()
    }

    fn subscribe_ready(&mut self, target: &str) {
        self.ready_listeners.push(target.to_string());
    }

    fn clip_names(&self, target: &str) -> Vec<String> {
        self.entity(target)
            .map(|entity| entity.clips.clone())
            .unwrap_or_default()
    }

    fn play_clip(&mut self, target: &str, clip: &str, mode: PlayMode) {
        info!(entity = %target, clip, ?mode, "Playing clip");
        self.ops.push(SceneOp::PlayClip {
            target: target.to_string(),
            clip: clip.to_string(),
            mode,
        });
    }

    fn find_joint(&self, target: &str, name: &str) -> Result<Option<JointId>, SceneError> {
        let entity = self.entity(target)?;
        Ok(entity
            .joints
            .iter()
            .position(|joint| joint == name)
            .map(JointId))
    }

    fn joint_rotation(&self, target: &str, joint: JointId, axis: Axis) -> Result<f32, SceneError> {
        self.checked_joint(target, joint, false)?;
        Ok(self
            .rotations
            .get(&(target.to_string(), joint))
            .map_or(0.0, |rotation| rotation[axis.index()]))
    }

    fn set_joint_rotation(
        &mut self,
        target: &str,
        joint: JointId,
        axis: Axis,
        radians: f32,
    ) -> Result<(), SceneError> {
        self.checked_joint(target, joint, true)?;
        self.rotations
            .entry((target.to_string(), joint))
            .or_insert([0.0; 3])[axis.index()] = radians;
        debug!(entity = %target, joint = joint.0, ?axis, radians, "Joint rotated");
        self.ops.push(SceneOp::SetJoint {
            target: target.to_string(),
            joint,
            axis,
            radians,
        });
        Ok(())
    }

    fn apply_modifier(&mut self, target: &str, modifier: Modifier) {
        info!(entity = %target, ?modifier, "Applying modifier");
        self.ops.push(SceneOp::Modifier {
            target: target.to_string(),
            modifier,
        });
    }

    fn mouth_cue_on(&mut self, target: &str, phoneme: &str) {
        debug!(entity = %target, phoneme, "Mouth cue on");
        self.ops.push(SceneOp::CueOn {
            target: target.to_string(),
            phoneme: phoneme.to_string(),
        });
    }

    fn mouth_cue_off(&mut self, target: &str, phoneme: &str) {
        debug!(entity = %target, phoneme, "Mouth cue off");
        self.ops.push(SceneOp::CueOff {
            target: target.to_string(),
            phoneme: phoneme.to_string(),
        });
    }

    fn play_audio(&mut self, target: &str, audio_ref: &str) {
        info!(entity = %target, audio_ref, "Playing audio");
        self.ops.push(SceneOp::Audio {
            target: target.to_string(),
            audio_ref: audio_ref.to_string(),
        });
    }
}
