//! Authoring-stage output: the exact spoken script for every planned segment.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::structure::{BreathPattern, Difficulty, SegmentType};

/// Phase of a breath cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    Inhale,
    Exhale,
    Hold,
    Rest,
}

impl BreathPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inhale => "inhale",
            Self::Exhale => "exhale",
            Self::Hold => "hold",
            Self::Rest => "rest",
        }
    }
}

impl fmt::Display for BreathPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BreathPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inhale" => Ok(Self::Inhale),
            "exhale" => Ok(Self::Exhale),
            "hold" => Ok(Self::Hold),
            "rest" => Ok(Self::Rest),
            _ => Err(()),
        }
    }
}

/// A verbal cue tied to one breath phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathCue {
    pub phase: BreathPhase,
    /// Exact spoken text for the cue.
    pub text: String,
    /// Optional sound asset to play alongside the cue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

/// Guided breathing for a segment: a pattern repeated a number of times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathGuidance {
    pub pattern: BreathPattern,
    pub repetitions: u32,
    /// Verbal cues voiced during the cycle, if any.
    #[serde(default)]
    pub cues: Vec<BreathCue>,
}

impl BreathGuidance {
    /// Total guided-breathing duration: one cycle times the repetition count.
    pub fn total_seconds(&self) -> f64 {
        self.pattern.cycle_seconds() * f64::from(self.repetitions)
    }
}

/// The full script for one planned segment, matched to its plan by `id`.
///
/// All text fields may be empty for `silence`-typed segments; for every other
/// type the main guidance text is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSegment {
    /// Id of the `SegmentPlan` this script belongs to.
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    /// Spoken text that opens the segment.
    #[serde(default)]
    pub opening_text: String,
    /// The main guidance text of the segment.
    #[serde(default)]
    pub guidance_text: String,
    /// Spoken transition into the next segment.
    #[serde(default)]
    pub transition_text: String,
    /// Spoken text that closes the segment.
    #[serde(default)]
    pub closing_text: String,
    #[serde(default)]
    pub breath_cues: Vec<BreathCue>,
    /// Structured breathing exercise, if the segment has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breath_guidance: Option<BreathGuidance>,
    /// Explicitly chosen stillness duration for the segment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_seconds: Option<f64>,
}

impl ScriptSegment {
    /// All spoken text fields in playback order.
    pub fn spoken_texts(&self) -> [&str; 4] {
        [
            &self.opening_text,
            &self.guidance_text,
            &self.transition_text,
            &self.closing_text,
        ]
    }
}

/// Authoring-stage output: one `ScriptSegment` per planned segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationContent {
    pub title: String,
    pub theme: String,
    pub difficulty: Difficulty,
    pub segments: Vec<ScriptSegment>,
}

impl MeditationContent {
    /// Look up a script segment by plan id.
    pub fn segment(&self, id: &str) -> Option<&ScriptSegment> {
        self.segments.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breath_phase_rejects_unknown() {
        assert!(serde_json::from_str::<BreathPhase>("\"sigh\"").is_err());
        let phase: BreathPhase = serde_json::from_str("\"inhale\"").unwrap();
        assert_eq!(phase, BreathPhase::Inhale);
    }

    #[test]
    fn test_breath_guidance_total() {
        let guidance = BreathGuidance {
            pattern: BreathPattern {
                inhale_seconds: 4.0,
                hold_seconds: 0.0,
                exhale_seconds: 6.0,
                rest_seconds: 2.0,
            },
            repetitions: 3,
            cues: vec![],
        };
        assert_eq!(guidance.total_seconds(), 36.0);
    }

    #[test]
    fn test_script_segment_defaults() {
        let segment: ScriptSegment = serde_json::from_str(
            r#"{"id": "still", "title": "Stillness", "type": "silence"}"#,
        )
        .unwrap();
        assert!(segment.guidance_text.is_empty());
        assert!(segment.breath_cues.is_empty());
        assert!(segment.silence_seconds.is_none());
    }
}
