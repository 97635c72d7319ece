//! Frame-driven timers and joint tweens.
//!
//! Nothing here runs on its own: the host calls into the timeline once per
//! rendered frame with the current scene time. Timers due at the same instant
//! fire in the order they were scheduled.

use crate::{
    command::AnimationCommand,
    scene::{Axis, JointId, Scene},
};
use std::{collections::BTreeMap, time::Duration};
use tracing::warn;

/// Deferred work fired when its due time is reached.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerAction {
    /// Apply a command whose start offset has elapsed.
    Apply(AnimationCommand),
    /// Return a target to its resting clip after a gesture.
    RevertToIdle { target: String },
    CueOn { target: String, phoneme: String },
    CueOff { target: String, phoneme: String },
}

/// Linear interpolation of one joint rotation axis.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTween {
    pub target: String,
    pub joint: JointId,
    pub axis: Axis,
    pub from: f32,
    pub to: f32,
    pub started: Duration,
    pub duration: Duration,
}

impl JointTween {
    /// Value at `now`, and whether the tween has finished.
    pub fn sample(&self, now: Duration) -> (f32, bool) {
        let elapsed = now.saturating_sub(self.started);
        if self.duration.is_zero() || elapsed >= self.duration {
            return (self.to, true);
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        (self.from + (self.to - self.from) * t, false)
    }
}

#[derive(Debug, Default)]
pub struct Timeline {
    next_seq: u64,
    timers: BTreeMap<(Duration, u64), TimerAction>,
    tweens: Vec<JointTween>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Duration, action: TimerAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert((at, seq), action);
    }

    /// Removes and returns every timer due at or before `now`, in firing order.
    pub fn take_due(&mut self, now: Duration) -> Vec<TimerAction> {
        let later = self.timers.split_off(&(now, u64::MAX));
        std::mem::replace(&mut self.timers, later)
            .into_values()
            .collect()
    }

    pub fn start_tween(&mut self, tween: JointTween) {
        self.tweens.push(tween);
    }

    /// Writes every active tween's value for `now` into the scene.
    ///
    /// Finished tweens are dropped. A tween the scene refuses to update is
    /// dropped as well, and its target is returned so the caller can
    /// substitute a fallback reaction.
    pub fn step_tweens<S: Scene + ?Sized>(&mut self, scene: &mut S, now: Duration) -> Vec<String> {
        let mut failed: Vec<String> = Vec::new();
        self.tweens.retain(|tween| {
            let (value, done) = tween.sample(now);
            match scene.set_joint_rotation(&tween.target, tween.joint, tween.axis, value) {
                Ok(()) => !done,
                Err(e) => {
                    warn!(entity = %tween.target, error = %e, "Joint interpolation failed");
                    if !failed.contains(&tween.target) {
                        failed.push(tween.target.clone());
                    }
                    false
                }
            }
        });
        failed
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn active_tweens(&self) -> &[JointTween] {
        &self.tweens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn revert(target: &str) -> TimerAction {
        TimerAction::RevertToIdle {
            target: target.into(),
        }
    }

    #[test]
    fn test_take_due_respects_time_then_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(200), revert("c"));
        timeline.schedule(ms(100), revert("a"));
        timeline.schedule(ms(100), revert("b"));
        timeline.schedule(ms(300), revert("d"));

        assert_eq!(timeline.take_due(ms(50)), vec![]);
        assert_eq!(
            timeline.take_due(ms(200)),
            vec![revert("a"), revert("b"), revert("c")]
        );
        assert_eq!(timeline.pending_timers(), 1);
        assert_eq!(timeline.take_due(ms(1000)), vec![revert("d")]);
    }

    #[test]
    fn test_tween_sampling() {
        let tween = JointTween {
            target: "a".into(),
            joint: JointId(0),
            axis: Axis::X,
            from: 1.0,
            to: 2.0,
            started: ms(100),
            duration: ms(400),
        };
        assert_eq!(tween.sample(ms(0)), (1.0, false));
        assert_eq!(tween.sample(ms(300)), (1.5, false));
        assert_eq!(tween.sample(ms(500)), (2.0, true));
        assert_eq!(tween.sample(ms(900)), (2.0, true));
    }

    #[test]
    fn test_zero_length_tween_lands_immediately() {
        let tween = JointTween {
            target: "a".into(),
            joint: JointId(0),
            axis: Axis::Y,
            from: 0.0,
            to: -0.5,
            started: ms(10),
            duration: Duration::ZERO,
        };
        assert_eq!(tween.sample(ms(10)), (-0.5, true));
    }
}
