//! Viseme Scheduler
//!
//! Turns a viseme sequence into cue-on/cue-off timers on the [`Timeline`].
//! Cues may overlap; each one reverts on its own.

use crate::{
    command::Viseme,
    timeline::{Timeline, TimerAction},
};
use std::time::Duration;

/// How long a single mouth shape stays visible.
pub const CUE_DURATION: Duration = Duration::from_millis(180);

/// Schedules `visemes` for `target`, relative to `speech_start`.
pub fn schedule(timeline: &mut Timeline, target: &str, visemes: &[Viseme], speech_start: Duration) {
    for viseme in visemes {
        let at = speech_start + Duration::from_millis(viseme.offset_ms);
        timeline.schedule(
            at,
            TimerAction::CueOn {
                target: target.to_string(),
                phoneme: viseme.phoneme.clone(),
            },
        );
        timeline.schedule(
            at + CUE_DURATION,
            TimerAction::CueOff {
                target: target.to_string(),
                phoneme: viseme.phoneme.clone(),
            },
        );
    }
}
