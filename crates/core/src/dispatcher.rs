//! Command Dispatcher
//!
//! One dispatcher runs per viewer. It tracks, for every target, whether the
//! target's asset has loaded. Commands for a loaded target are applied on the
//! spot; commands for a target still loading wait in the [`PendingQueue`]
//! and are flushed, in arrival order, when the scene engine reports the asset
//! ready through [`Dispatcher::on_asset_ready`].
//!
//! Everything runs on the caller's thread. The host drives time by calling
//! [`Dispatcher::advance`] once per rendered frame.

use crate::{
    command::{AnimationCommand, CommandBatch, CommandKind},
    fallback,
    pending::PendingQueue,
    scene::{IDLE_CLIP, PlayMode, Scene, emotion_modifier},
    timeline::{Timeline, TimerAction},
    viseme,
};
use std::{collections::HashSet, time::Duration};
use tracing::{debug, info, warn};

/// What happened to a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    Deferred,
    /// The target is not in the scene.
    Dropped,
}

pub struct Dispatcher<S: Scene> {
    scene: S,
    ready: HashSet<String>,
    pending: PendingQueue,
    timeline: Timeline,
    now: Duration,
}

impl<S: Scene> Dispatcher<S> {
    pub fn new(scene: S) -> Self {
        Self {
            scene,
            ready: HashSet::new(),
            pending: PendingQueue::new(),
            timeline: Timeline::new(),
            now: Duration::ZERO,
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Scene time of the most recent frame.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_ready(&self, target: &str) -> bool {
        self.ready.contains(target)
    }

    pub fn pending_len(&self, target: &str) -> usize {
        self.pending.len(target)
    }

    /// Dispatches every command of `batch`, in batch order.
    pub fn dispatch_batch(&mut self, batch: CommandBatch) {
        self.dispatch_all(batch.commands);
    }

    pub fn dispatch_all(&mut self, commands: impl IntoIterator<Item = AnimationCommand>) {
        for cmd in commands {
            self.dispatch(cmd);
        }
    }

    pub fn dispatch(&mut self, cmd: AnimationCommand) -> Dispatch {
        if !self.scene.has_entity(&cmd.target) {
            warn!(entity = %cmd.target, kind = cmd.kind_name(), "Target not found for animation command");
            return Dispatch::Dropped;
        }

        if !self.ready.contains(&cmd.target) {
            let target = cmd.target.clone();
            debug!(entity = %target, kind = cmd.kind_name(), "Asset not loaded yet, queuing command");
            if self.pending.push(cmd) {
                self.scene.subscribe_ready(&target);
            }
            return Dispatch::Deferred;
        }

        self.apply(cmd);
        Dispatch::Applied
    }

    /// Records that `target`'s asset has loaded and flushes its pending
    /// commands. The host must forward every load notification, including
    /// those for targets that never had a command deferred.
    pub fn on_asset_ready(&mut self, target: &str) {
        if !self.ready.insert(target.to_string()) {
            debug!(entity = %target, "Duplicate ready notification ignored");
            return;
        }

        let pending = self.pending.take(target);
        if !pending.is_empty() {
            info!(entity = %target, count = pending.len(), "Flushing pending commands");
        }
        // The target is ready now, so none of these can be deferred again.
        for cmd in pending {
            self.dispatch(cmd);
        }
    }

    /// Advances scene time to `now`: fires due timers and steps tweens.
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);

        for action in self.timeline.take_due(self.now) {
            match action {
                TimerAction::Apply(cmd) => self.apply_now(cmd),
                TimerAction::RevertToIdle { target } => {
                    self.scene.play_clip(&target, IDLE_CLIP, PlayMode::Loop);
                }
                TimerAction::CueOn { target, phoneme } => self.scene.mouth_cue_on(&target, &phoneme),
                TimerAction::CueOff { target, phoneme } => {
                    self.scene.mouth_cue_off(&target, &phoneme);
                }
            }
        }

        for target in self.timeline.step_tweens(&mut self.scene, self.now) {
            fallback::generic_turn(&mut self.scene, &target);
        }
    }

    fn apply(&mut self, mut cmd: AnimationCommand) {
        if cmd.start_offset_ms > 0 {
            let at = self.now + Duration::from_millis(cmd.start_offset_ms);
            cmd.start_offset_ms = 0;
            self.timeline.schedule(at, TimerAction::Apply(cmd));
            return;
        }
        self.apply_now(cmd);
    }

    fn apply_now(&mut self, cmd: AnimationCommand) {
        debug!(entity = %cmd.target, kind = cmd.kind_name(), "Applying animation command");
        let AnimationCommand { target, kind, .. } = cmd;

        match kind {
            CommandKind::Idle => self.scene.play_clip(&target, IDLE_CLIP, PlayMode::Loop),
            CommandKind::Speak { visemes, audio_ref } => {
                viseme::schedule(&mut self.timeline, &target, &visemes, self.now);
                if let Some(audio_ref) = audio_ref {
                    self.scene.play_audio(&target, &audio_ref);
                }
            }
            CommandKind::Gesture { name, duration_ms } => {
                let clips = self.scene.clip_names(&target);
                if clips.iter().any(|clip| *clip == name) {
                    self.scene.play_clip(&target, &name, PlayMode::Once);
                    self.timeline.schedule(
                        self.now + Duration::from_millis(duration_ms),
                        TimerAction::RevertToIdle {
                            target: target.clone(),
                        },
                    );
                } else {
                    warn!(
                        entity = %target,
                        gesture = %name,
                        available = ?clips,
                        "Gesture clip not found on model, performing procedural gesture"
                    );
                    fallback::perform_fallback(
                        &mut self.scene,
                        &mut self.timeline,
                        &target,
                        &name,
                        self.now,
                    );
                }
            }
            CommandKind::Emotion { emotion, .. } => match emotion_modifier(&emotion) {
                Some(modifier) => self.scene.apply_modifier(&target, modifier),
                None => debug!(entity = %target, %emotion, "No visual modifier for emotion"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{Provenance, Viseme},
        memory::{MemoryEntity, MemoryScene, SceneOp},
        scene::{GENERIC_TURN, MockScene, Modifier, PlayMode},
    };

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn avatar() -> MemoryEntity {
        MemoryEntity::new("avatar-1").with_clips(["idle", "wave"]).with_joints([
            "mixamorig:Spine_02",
            "mixamorig:LeftArm",
            "mixamorig:RightArm",
        ])
    }

    fn ready_dispatcher(entity: MemoryEntity) -> Dispatcher<MemoryScene> {
        let id = entity.id.clone();
        let mut dispatcher = Dispatcher::new(MemoryScene::new([entity]));
        dispatcher.on_asset_ready(&id);
        dispatcher
    }

    fn play(clip: &str, mode: PlayMode) -> SceneOp {
        SceneOp::PlayClip {
            target: "avatar-1".into(),
            clip: clip.into(),
            mode,
        }
    }

    fn modifier(modifier: Modifier) -> SceneOp {
        SceneOp::Modifier {
            target: "avatar-1".into(),
            modifier,
        }
    }

    #[test]
    fn test_batch_applies_in_order() {
        let mut dispatcher = ready_dispatcher(avatar());
        dispatcher.dispatch_batch(CommandBatch {
            commands: vec![
                AnimationCommand::gesture("avatar-1", "wave"),
                AnimationCommand::emotion("avatar-1", "joyful", 0.9),
                AnimationCommand::idle("avatar-1"),
            ],
            provenance: Provenance {
                source_event_id: "evt".into(),
                generated_at: None,
            },
        });

        assert_eq!(
            dispatcher.scene().ops(),
            &[
                play("wave", PlayMode::Once),
                modifier(Modifier::Bounce {
                    height: 0.05,
                    duration_ms: 400
                }),
                play("idle", PlayMode::Loop),
            ]
        );
    }

    #[test]
    fn test_unknown_target_is_dropped() {
        let mut dispatcher = ready_dispatcher(avatar());
        let outcome = dispatcher.dispatch(AnimationCommand::idle("ghost"));
        assert_eq!(outcome, Dispatch::Dropped);
        assert!(dispatcher.scene().ops().is_empty());
        assert!(dispatcher.scene().ready_listeners().is_empty());
        assert_eq!(dispatcher.pending_len("ghost"), 0);
    }

    #[test]
    fn test_deferred_commands_flush_once_in_order() {
        let mut dispatcher = Dispatcher::new(MemoryScene::new([avatar()]));
        let commands = [
            AnimationCommand::gesture("avatar-1", "wave"),
            AnimationCommand::emotion("avatar-1", "firm", 0.8),
            AnimationCommand::idle("avatar-1"),
        ];
        for cmd in commands {
            assert_eq!(dispatcher.dispatch(cmd), Dispatch::Deferred);
        }

        dispatcher.advance(ms(500));
        assert!(dispatcher.scene().ops().is_empty());
        assert_eq!(dispatcher.pending_len("avatar-1"), 3);
        assert_eq!(dispatcher.scene().ready_listeners(), &["avatar-1".to_string()]);

        dispatcher.on_asset_ready("avatar-1");
        let expected = [
            play("wave", PlayMode::Once),
            modifier(Modifier::Lean {
                pitch_degrees: 4.0,
                duration_ms: 300
            }),
            play("idle", PlayMode::Loop),
        ];
        assert_eq!(dispatcher.scene().ops(), &expected);
        assert_eq!(dispatcher.pending_len("avatar-1"), 0);

        dispatcher.on_asset_ready("avatar-1");
        assert_eq!(dispatcher.scene().ops(), &expected);
    }

    #[test]
    fn test_ready_listener_registered_once_per_target() {
        let mut scene = MockScene::new();
        scene.expect_has_entity().return_const(true);
        scene
            .expect_subscribe_ready()
            .withf(|target: &str| target == "avatar-1")
            .times(1)
            .return_const(());
        scene
            .expect_subscribe_ready()
            .withf(|target: &str| target == "avatar-2")
            .times(1)
            .return_const(());

        let mut dispatcher = Dispatcher::new(scene);
        dispatcher.dispatch(AnimationCommand::idle("avatar-1"));
        dispatcher.dispatch(AnimationCommand::gesture("avatar-1", "wave"));
        dispatcher.dispatch(AnimationCommand::idle("avatar-2"));
        dispatcher.dispatch(AnimationCommand::emotion("avatar-1", "sad", 0.4));
        assert_eq!(dispatcher.pending_len("avatar-1"), 3);
    }

    #[test]
    fn test_gesture_waits_for_slow_asset() {
        let mut dispatcher =
            Dispatcher::new(MemoryScene::new([avatar().with_load_delay(2000)]));
        dispatcher.dispatch(AnimationCommand::gesture("avatar-1", "wave"));

        let mut waves_at = Vec::new();
        for frame in 0..=250u64 {
            let now = ms(frame * 16);
            dispatcher.advance(now);
            for target in dispatcher.scene_mut().drain_loaded(now) {
                dispatcher.on_asset_ready(&target);
            }
            for op in dispatcher.scene_mut().take_ops() {
                if op == play("wave", PlayMode::Once) {
                    waves_at.push(now);
                }
            }
        }

        // The first frame at or after 2000 ms is frame 125 (2000 ms).
        assert_eq!(waves_at, vec![ms(2000)]);
    }

    #[test]
    fn test_clip_gesture_reverts_to_idle() {
        let mut dispatcher = ready_dispatcher(avatar());
        dispatcher.dispatch(
            AnimationCommand::new(
                "avatar-1",
                CommandKind::Gesture {
                    name: "wave".into(),
                    duration_ms: 1000,
                },
            ),
        );
        dispatcher.advance(ms(999));
        assert_eq!(dispatcher.scene().ops(), &[play("wave", PlayMode::Once)]);
        dispatcher.advance(ms(1000));
        assert_eq!(
            dispatcher.scene().ops(),
            &[play("wave", PlayMode::Once), play("idle", PlayMode::Loop)]
        );
    }

    #[test]
    fn test_missing_clip_uses_procedural_fallback() {
        let mut dispatcher = ready_dispatcher(avatar());
        dispatcher.dispatch(AnimationCommand::gesture("avatar-1", "open-hands"));
        assert_eq!(dispatcher.timeline().active_tweens().len(), 2);

        dispatcher.advance(ms(200));
        dispatcher.advance(ms(400));
        let moved: Vec<_> = dispatcher
            .scene()
            .ops()
            .iter()
            .filter(|op| matches!(op, SceneOp::SetJoint { .. }))
            .collect();
        assert_eq!(moved.len(), 4);
        assert!(dispatcher.timeline().active_tweens().is_empty());
    }

    #[test]
    fn test_fallback_always_shows_something() {
        let names = ["moonwalk", "bow", "CELEBRATE", "", "hand-stop"];
        for name in names {
            // No clips and no joints at all.
            let mut dispatcher = ready_dispatcher(MemoryEntity::new("avatar-1"));
            dispatcher.dispatch(AnimationCommand::gesture("avatar-1", name));
            for frame in 1..=60u64 {
                dispatcher.advance(ms(frame * 16));
            }
            assert!(
                !dispatcher.scene().ops().is_empty(),
                "gesture {name:?} produced no visible change"
            );
        }
    }

    #[test]
    fn test_failed_interpolation_turns_instead() {
        let mut dispatcher = ready_dispatcher(avatar().with_frozen_joints());
        dispatcher.dispatch(AnimationCommand::gesture("avatar-1", "bow"));
        dispatcher.advance(ms(16));
        assert_eq!(dispatcher.scene().ops(), &[modifier(GENERIC_TURN)]);
        assert!(dispatcher.timeline().active_tweens().is_empty());
    }

    #[test]
    fn test_speak_schedules_cues_and_audio() {
        let mut dispatcher = ready_dispatcher(avatar());
        dispatcher.advance(ms(100));
        dispatcher.dispatch(AnimationCommand::new(
            "avatar-1",
            CommandKind::Speak {
                visemes: vec![Viseme::new("aa", 0), Viseme::new("O", 50)],
                audio_ref: Some("/tts/reply.mp3".into()),
            },
        ));
        assert_eq!(
            dispatcher.scene().ops(),
            &[SceneOp::Audio {
                target: "avatar-1".into(),
                audio_ref: "/tts/reply.mp3".into()
            }]
        );

        dispatcher.advance(ms(150));
        dispatcher.advance(ms(400));
        let cues: Vec<_> = dispatcher
            .scene()
            .ops()
            .iter()
            .filter_map(|op| match op {
                SceneOp::CueOn { phoneme, .. } => Some(format!("+{phoneme}")),
                SceneOp::CueOff { phoneme, .. } => Some(format!("-{phoneme}")),
                _ => None,
            })
            .collect();
        assert_eq!(cues, vec!["+aa", "+O", "-aa", "-O"]);
    }

    #[test]
    fn test_unknown_emotion_is_a_no_op() {
        let mut dispatcher = ready_dispatcher(avatar());
        assert_eq!(
            dispatcher.dispatch(AnimationCommand::emotion("avatar-1", "bewildered", 1.0)),
            Dispatch::Applied
        );
        assert!(dispatcher.scene().ops().is_empty());
    }

    #[test]
    fn test_start_offset_delays_application() {
        let mut dispatcher = ready_dispatcher(avatar());
        dispatcher.dispatch(AnimationCommand::idle("avatar-1").with_start_offset(300));
        dispatcher.advance(ms(299));
        assert!(dispatcher.scene().ops().is_empty());
        dispatcher.advance(ms(300));
        assert_eq!(dispatcher.scene().ops(), &[play("idle", PlayMode::Loop)]);
    }

    #[test]
    fn test_ready_before_any_command_applies_immediately() {
        let mut dispatcher = ready_dispatcher(avatar());
        assert!(dispatcher.is_ready("avatar-1"));
        assert_eq!(
            dispatcher.dispatch(AnimationCommand::idle("avatar-1")),
            Dispatch::Applied
        );
        assert!(dispatcher.scene().ready_listeners().is_empty());
    }
}
