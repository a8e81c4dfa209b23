//! Orchestration-stage output: absolute start/end times for every segment and
//! every instruction within it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::structure::SegmentType;

/// The executor agent an instruction is addressed to.
///
/// Instructions of different agents inside the same segment may play in
/// parallel; instructions of the same agent are strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Voice,
    Breath,
    Timer,
    Music,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Breath => "breath",
            Self::Timer => "timer",
            Self::Music => "music",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed action vocabulary across all four executor agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    // Voice
    Speak,
    Pause,
    // Breath
    InhaleCue,
    ExhaleCue,
    BreathingCycle,
    // Timer
    Silence,
    TransitionCue,
    SegmentTimer,
    // Music
    Play,
    FadeIn,
    FadeOut,
    VolumeChange,
}

impl ActionType {
    /// The agent that owns this action.
    pub fn agent(&self) -> AgentKind {
        match self {
            Self::Speak | Self::Pause => AgentKind::Voice,
            Self::InhaleCue | Self::ExhaleCue | Self::BreathingCycle => AgentKind::Breath,
            Self::Silence | Self::TransitionCue | Self::SegmentTimer => AgentKind::Timer,
            Self::Play | Self::FadeIn | Self::FadeOut | Self::VolumeChange => AgentKind::Music,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speak => "speak",
            Self::Pause => "pause",
            Self::InhaleCue => "inhale_cue",
            Self::ExhaleCue => "exhale_cue",
            Self::BreathingCycle => "breathing_cycle",
            Self::Silence => "silence",
            Self::TransitionCue => "transition_cue",
            Self::SegmentTimer => "segment_timer",
            Self::Play => "play",
            Self::FadeIn => "fade_in",
            Self::FadeOut => "fade_out",
            Self::VolumeChange => "volume_change",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed instruction inside a segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedInstruction {
    pub agent: AgentKind,
    pub action: ActionType,
    /// Absolute start time, seconds from session start.
    pub start_seconds: f64,
    pub duration_seconds: f64,
    /// Action parameters; required keys depend on the action type.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl TimedInstruction {
    pub fn new(action: ActionType, start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            agent: action.agent(),
            action,
            start_seconds,
            duration_seconds,
            parameters: Map::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// A segment with an exact time span and its ordered instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedSegment {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub instructions: Vec<TimedInstruction>,
}

impl TimedSegment {
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Orchestration-stage output: the fully-timed session skeleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationTiming {
    pub title: String,
    /// Exactly `total_duration_minutes * 60`.
    pub total_duration_seconds: f64,
    pub segments: Vec<TimedSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_agent_ownership() {
        assert_eq!(ActionType::Speak.agent(), AgentKind::Voice);
        assert_eq!(ActionType::BreathingCycle.agent(), AgentKind::Breath);
        assert_eq!(ActionType::Silence.agent(), AgentKind::Timer);
        assert_eq!(ActionType::FadeOut.agent(), AgentKind::Music);
    }

    #[test]
    fn test_agent_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AgentKind::Voice).unwrap(), "\"voice\"");
        assert_eq!(
            serde_json::to_string(&ActionType::BreathingCycle).unwrap(),
            "\"breathing_cycle\""
        );
    }

    #[test]
    fn test_instruction_builder() {
        let instruction = TimedInstruction::new(ActionType::Speak, 0.0, 8.0)
            .with_parameter("text", serde_json::json!("Welcome."));
        assert_eq!(instruction.agent, AgentKind::Voice);
        assert_eq!(instruction.end_seconds(), 8.0);
        assert_eq!(instruction.parameters["text"], "Welcome.");
    }
}
