//! Procedural Gesture Fallback
//!
//! When a gesture clip is missing from an asset, the gesture is approximated
//! by rotating skeletal joints directly. Each gesture maps to a choreography:
//! a handful of joint motions, each an additive rotation on one axis over a
//! fixed duration. The motions are handed to the [`Timeline`] as tweens and
//! advance with every rendered frame.
//!
//! Joints are resolved through an ordered alias table because asset
//! exporters disagree on bone names. A joint with no matching alias is
//! skipped. If nothing at all can be moved, or the scene reports an error,
//! the entity gets [`GENERIC_TURN`] instead so the viewer still sees a
//! reaction.

use crate::{
    error::SceneError,
    scene::{Axis, GENERIC_TURN, JointId, Modifier, Scene},
    timeline::{JointTween, Timeline},
};
use std::time::Duration;
use tracing::{debug, warn};

/// A logical joint, independent of the asset's naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    LeftUpperArm,
    LeftForeArm,
    RightUpperArm,
    RightForeArm,
    Spine,
}

impl Joint {
    /// Acceptable node names, most specific first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Joint::LeftUpperArm => &["mixamorig:LeftArm_09", "mixamorig:LeftArm", "LeftUpperArm"],
            Joint::LeftForeArm => &[
                "mixamorig:LeftForeArm_010",
                "mixamorig:LeftForeArm",
                "LeftLowerArm",
            ],
            Joint::RightUpperArm => &["mixamorig:RightArm", "RightUpperArm"],
            Joint::RightForeArm => &["mixamorig:RightForeArm", "RightLowerArm"],
            Joint::Spine => &[
                "mixamorig:Spine1_03",
                "mixamorig:Spine_02",
                "mixamorig:Spine1",
                "Spine",
            ],
        }
    }
}

/// First alias of `joint` present on `target`'s skeleton.
pub fn resolve_joint<S: Scene + ?Sized>(
    scene: &S,
    target: &str,
    joint: Joint,
) -> Result<Option<JointId>, SceneError> {
    for alias in joint.aliases() {
        if let Some(id) = scene.find_joint(target, alias)? {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMotion {
    pub joint: Joint,
    pub axis: Axis,
    /// Radians added to the joint's current rotation.
    pub offset: f32,
    pub duration_ms: u64,
}

const fn motion(joint: Joint, axis: Axis, offset: f32, duration_ms: u64) -> JointMotion {
    JointMotion {
        joint,
        axis,
        offset,
        duration_ms,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choreography {
    pub motions: &'static [JointMotion],
    /// Whole-entity flourish played alongside the joint motions.
    pub flourish: Option<Modifier>,
}

const BOW: Choreography = Choreography {
    motions: &[motion(Joint::Spine, Axis::X, -0.35, 600)],
    flourish: None,
};
const OPEN_HANDS: Choreography = Choreography {
    motions: &[
        motion(Joint::LeftUpperArm, Axis::Z, -1.2, 400),
        motion(Joint::RightUpperArm, Axis::Z, 1.2, 400),
    ],
    flourish: None,
};
const HAND_STOP: Choreography = Choreography {
    motions: &[motion(Joint::RightUpperArm, Axis::X, -0.9, 300)],
    flourish: None,
};
const CELEBRATION: Choreography = Choreography {
    motions: &[
        motion(Joint::LeftUpperArm, Axis::Z, -1.4, 400),
        motion(Joint::RightUpperArm, Axis::Z, 1.4, 400),
    ],
    flourish: Some(Modifier::Bounce {
        height: 0.06,
        duration_ms: 250,
    }),
};
const WAVE: Choreography = Choreography {
    motions: &[
        motion(Joint::RightUpperArm, Axis::Z, 1.2, 400),
        motion(Joint::RightForeArm, Axis::X, -0.5, 400),
    ],
    flourish: None,
};

/// Looks up the choreography for a gesture name, case-insensitively.
pub fn choreography(gesture: &str) -> Option<Choreography> {
    match gesture.trim().to_lowercase().as_str() {
        "bow" | "apologetic-bow" => Some(BOW),
        "open-hands" | "open_hands" | "openhands" => Some(OPEN_HANDS),
        "hand-stop" | "set-boundary" => Some(HAND_STOP),
        "celebration" | "celebrate" => Some(CELEBRATION),
        "wave" => Some(WAVE),
        _ => None,
    }
}

/// What the fallback ended up showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// The choreography started with this many joint tweens.
    Choreographed { joints: usize },
    GenericTurn,
}

/// Performs `gesture` on `target` procedurally. Never fails.
pub fn perform_fallback<S: Scene + ?Sized>(
    scene: &mut S,
    timeline: &mut Timeline,
    target: &str,
    gesture: &str,
    now: Duration,
) -> FallbackOutcome {
    let Some(choreo) = choreography(gesture) else {
        debug!(entity = %target, gesture, "No choreography for gesture, using generic turn");
        return generic_turn(scene, target);
    };

    match plan_tweens(scene, target, &choreo, now) {
        Ok(tweens) if tweens.is_empty() && choreo.flourish.is_none() => {
            debug!(entity = %target, gesture, "Skeleton has none of the choreography's joints");
            generic_turn(scene, target)
        }
        Ok(tweens) => {
            let joints = tweens.len();
            for tween in tweens {
                timeline.start_tween(tween);
            }
            if let Some(flourish) = choreo.flourish {
                scene.apply_modifier(target, flourish);
            }
            debug!(entity = %target, gesture, joints, "Procedural gesture started");
            FallbackOutcome::Choreographed { joints }
        }
        Err(e) => {
            warn!(entity = %target, gesture, error = %e, "Procedural gesture failed");
            generic_turn(scene, target)
        }
    }
}

/// Resolves every motion before anything is started, so a failure midway
/// leaves no half-played choreography behind.
fn plan_tweens<S: Scene + ?Sized>(
    scene: &S,
    target: &str,
    choreo: &Choreography,
    now: Duration,
) -> Result<Vec<JointTween>, SceneError> {
    let mut tweens = Vec::with_capacity(choreo.motions.len());
    for motion in choreo.motions {
        let Some(joint) = resolve_joint(scene, target, motion.joint)? else {
            continue;
        };
        let from = scene.joint_rotation(target, joint, motion.axis)?;
        tweens.push(JointTween {
            target: target.to_string(),
            joint,
            axis: motion.axis,
            from,
            to: from + motion.offset,
            started: now,
            duration: Duration::from_millis(motion.duration_ms),
        });
    }
    Ok(tweens)
}

pub fn generic_turn<S: Scene + ?Sized>(scene: &mut S, target: &str) -> FallbackOutcome {
    scene.apply_modifier(target, GENERIC_TURN);
    FallbackOutcome::GenericTurn
}
