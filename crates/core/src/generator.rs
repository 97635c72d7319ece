//! Command Generator
//!
//! Turns a semantic [`Event`] into an ordered [`CommandBatch`]. Generation is
//! a pure, total function: it performs no I/O, never fails, and always emits
//! at least one command.
//!
//! Classification runs in a fixed priority order, first match wins:
//!
//! 1. A recognized therapeutic intent tag.
//! 2. Distress keywords, then greeting keywords, in the text.
//! 3. Plain speech for any remaining text.
//! 4. `idle` when there is neither text nor a recognized intent.
//!
//! A personality hint is applied last and only ever relabels (or adds) the
//! emotion command of a speaking batch.

use crate::{
    command::{AnimationCommand, CommandBatch, CommandKind, Provenance, Viseme},
    event::Event,
};

/// The avatar entity commands are addressed to when nothing else is configured.
pub const DEFAULT_TARGET: &str = "avatar-1";

const ANONYMOUS_SOURCE: &str = "anonymous";
const PERSONALITY_INTENSITY: f32 = 0.5;

/// A conversational intent recognized from event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Apology,
    SetBoundary,
    ValidateEmotion,
    Celebrate,
}

/// Gesture and emotion a classified event expresses.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Expression {
    gesture: &'static str,
    emotion: Option<(&'static str, f32)>,
}

impl Intent {
    /// Recognizes a tag, including the spellings the control UI emits.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "apology" | "agent-apologises" | "apologise" | "apologize" => Some(Self::Apology),
            "set-boundary" => Some(Self::SetBoundary),
            "validate-emotion" => Some(Self::ValidateEmotion),
            "celebrate" | "celebration" => Some(Self::Celebrate),
            _ => None,
        }
    }

    fn expression(self) -> Expression {
        let (gesture, emotion, intensity) = match self {
            Self::Apology => ("apologetic-bow", "remorseful", 0.7),
            Self::SetBoundary => ("hand-stop", "firm", 0.8),
            Self::ValidateEmotion => ("open-hands", "caring", 0.6),
            Self::Celebrate => ("celebration", "joyful", 0.9),
        };
        Expression {
            gesture,
            emotion: Some((emotion, intensity)),
        }
    }
}

const DISTRESS_WORDS: &[&str] = &[
    "sad", "scared", "afraid", "anxious", "worried", "upset", "hurt", "lonely", "nervous", "cry",
    "crying",
];
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "greetings", "howdy"];
const GREETING_PHRASES: &[&str] = &["good morning", "good afternoon", "good evening"];

fn keyword_expression(text: &str) -> Option<Expression> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has_any = |list: &[&str]| words.iter().any(|w| list.contains(w));

    if has_any(DISTRESS_WORDS) {
        return Some(Expression {
            gesture: "open-hands",
            emotion: Some(("caring", 0.6)),
        });
    }
    if has_any(GREETING_WORDS) || GREETING_PHRASES.iter().any(|p| lower.contains(p)) {
        return Some(Expression {
            gesture: "wave",
            emotion: None,
        });
    }
    None
}

fn personality_emotion(personality: &str) -> Option<&'static str> {
    match personality.trim().to_lowercase().as_str() {
        "playful" | "cheerful" => Some("joyful"),
        "empathetic" | "caring" | "gentle" => Some("caring"),
        "stern" | "assertive" => Some("firm"),
        _ => None,
    }
}

/// Placeholder mouth shapes used until real phoneme timings are available
/// from a lip-sync source.
pub fn placeholder_visemes() -> Vec<Viseme> {
    [("aa", 0), ("E", 120), ("O", 240), ("U", 360), ("sil", 480)]
        .into_iter()
        .map(|(phoneme, offset)| Viseme::new(phoneme, offset))
        .collect()
}

/// Generates command batches for a single avatar target.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    target: String,
}

impl Default for CommandGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

impl CommandGenerator {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Classifies `event` and returns its command batch.
    pub fn generate(&self, event: &Event) -> CommandBatch {
        CommandBatch {
            commands: self.commands_for(event),
            provenance: Provenance {
                source_event_id: event
                    .source_id
                    .clone()
                    .unwrap_or_else(|| ANONYMOUS_SOURCE.to_string()),
                generated_at: None,
            },
        }
    }

    fn commands_for(&self, event: &Event) -> Vec<AnimationCommand> {
        let intent = event.event_tags.iter().find_map(|tag| Intent::from_tag(tag));
        let text = event.trimmed_text();

        let expression = match (intent, text) {
            (Some(intent), _) => Some(intent.expression()),
            (None, Some(text)) => keyword_expression(text),
            (None, None) => return vec![AnimationCommand::idle(&self.target)],
        };

        let mut commands = vec![AnimationCommand::speak(&self.target, placeholder_visemes())];
        if let Some(expression) = expression {
            commands.push(AnimationCommand::gesture(&self.target, expression.gesture));
            if let Some((emotion, intensity)) = expression.emotion {
                commands.push(AnimationCommand::emotion(&self.target, emotion, intensity));
            }
        }

        if let Some(label) = event.personality.as_deref().and_then(personality_emotion) {
            self.apply_personality(&mut commands, label);
        }
        commands
    }

    fn apply_personality(&self, commands: &mut Vec<AnimationCommand>, label: &str) {
        let existing = commands.iter_mut().find_map(|cmd| match &mut cmd.kind {
            CommandKind::Emotion { emotion, .. } => Some(emotion),
            _ => None,
        });
        if let Some(emotion) = existing {
            *emotion = label.to_string();
            return;
        }
        commands.push(AnimationCommand::emotion(
            &self.target,
            label,
            PERSONALITY_INTENSITY,
        ));
    }
}
