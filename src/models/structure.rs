//! Design-stage output: the segment-level outline of a session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty level of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed segment-type vocabulary.
///
/// Structures proposing any type outside this set fail deserialization, which
/// the structure validator surfaces as a schema rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Opening,
    Breathwork,
    BodyAwareness,
    Visualization,
    Silence,
    Affirmation,
    Closing,
    Custom,
    Grounding,
    Deepening,
    Guidance,
}

impl SegmentType {
    /// Every member of the vocabulary, in declaration order.
    pub const ALL: [SegmentType; 11] = [
        Self::Opening,
        Self::Breathwork,
        Self::BodyAwareness,
        Self::Visualization,
        Self::Silence,
        Self::Affirmation,
        Self::Closing,
        Self::Custom,
        Self::Grounding,
        Self::Deepening,
        Self::Guidance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Breathwork => "breathwork",
            Self::BodyAwareness => "body_awareness",
            Self::Visualization => "visualization",
            Self::Silence => "silence",
            Self::Affirmation => "affirmation",
            Self::Closing => "closing",
            Self::Custom => "custom",
            Self::Grounding => "grounding",
            Self::Deepening => "deepening",
            Self::Guidance => "guidance",
        }
    }

    /// Whether this type is suited to open a session.
    pub fn suits_opening(&self) -> bool {
        matches!(self, Self::Opening | Self::Grounding)
    }

    /// Whether this type is suited to close a session.
    pub fn suits_closing(&self) -> bool {
        matches!(self, Self::Closing)
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A breathing pattern expressed as per-phase second counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathPattern {
    pub inhale_seconds: f64,
    #[serde(default)]
    pub hold_seconds: f64,
    pub exhale_seconds: f64,
    #[serde(default)]
    pub rest_seconds: f64,
}

impl BreathPattern {
    /// Duration of one full inhale/hold/exhale/rest cycle.
    pub fn cycle_seconds(&self) -> f64 {
        self.inhale_seconds + self.hold_seconds + self.exhale_seconds + self.rest_seconds
    }
}

/// One planned segment in the outline: an id, a display name, a type from the
/// fixed vocabulary, and an approximate duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    /// Approximate duration; the timing stage may stretch or trim this.
    pub duration_seconds: f64,
}

/// Design-stage output: session metadata plus the ordered segment outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationStructure {
    pub title: String,
    pub theme: String,
    pub difficulty: Difficulty,
    pub total_duration_minutes: u32,
    /// Suggested background music style, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music_style: Option<String>,
    pub planned_segments: Vec<SegmentPlan>,
    /// Important elements the content stage should weave in.
    #[serde(default)]
    pub key_elements: Vec<String>,
    /// Recommended breathing pattern for breathwork segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breathing_pattern: Option<BreathPattern>,
}

impl MeditationStructure {
    /// Target duration in seconds, exact (`minutes * 60`).
    pub fn total_seconds(&self) -> f64 {
        f64::from(self.total_duration_minutes) * 60.0
    }

    /// Sum of the approximate segment durations.
    pub fn planned_seconds(&self) -> f64 {
        self.planned_segments.iter().map(|s| s.duration_seconds).sum()
    }

    /// Look up a planned segment by id.
    pub fn segment(&self, id: &str) -> Option<&SegmentPlan> {
        self.planned_segments.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_type_snake_case_round_trip() {
        for ty in SegmentType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            let back: SegmentType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ty);
        }
    }

    #[test]
    fn test_unknown_segment_type_rejected() {
        let result = serde_json::from_str::<SegmentType>("\"warmup\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_total_seconds_exact() {
        let structure = MeditationStructure {
            title: "Clarity".into(),
            theme: "clarity".into(),
            difficulty: Difficulty::Beginner,
            total_duration_minutes: 10,
            background_music_style: None,
            planned_segments: vec![],
            key_elements: vec![],
            breathing_pattern: None,
        };
        assert_eq!(structure.total_seconds(), 600.0);
    }

    #[test]
    fn test_breath_pattern_cycle() {
        let pattern = BreathPattern {
            inhale_seconds: 4.0,
            hold_seconds: 7.0,
            exhale_seconds: 8.0,
            rest_seconds: 2.0,
        };
        assert_eq!(pattern.cycle_seconds(), 21.0);
    }
}
