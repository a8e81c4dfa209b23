//! Content completeness validator: checks a candidate `MeditationContent`
//! against the structure it was authored for.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::{BreathPhase, MeditationContent, MeditationStructure, SegmentType};

/// Rejection reasons for a candidate script.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    #[error("no script segment for planned segment '{id}'")]
    MissingSegment { id: String },

    #[error("script segment '{id}' does not match any planned segment")]
    UnknownSegment { id: String },

    #[error("more than one script segment for planned segment '{id}'")]
    DuplicateSegment { id: String },

    #[error("script segment '{id}' declares type '{actual}' but the plan says '{expected}'")]
    TypeMismatch {
        id: String,
        expected: SegmentType,
        actual: SegmentType,
    },

    #[error("script segment '{id}' has empty guidance text")]
    EmptyGuidanceText { id: String },

    #[error("script segment '{id}' has an empty {phase} cue")]
    EmptyBreathCue { id: String, phase: BreathPhase },

    #[error("script segment '{id}' repeats its breathing pattern {repetitions} times; at least 1 required")]
    InvalidRepetitions { id: String, repetitions: u32 },
}

/// Validate an authoring-stage script against its structure.
///
/// Every planned segment must have exactly one script segment, matched by id.
/// Guidance text is required except for silence-typed segments, where all
/// text may be absent.
pub fn validate_content(
    structure: &MeditationStructure,
    content: &MeditationContent,
) -> Result<(), ContentError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for script in &content.segments {
        let plan = structure
            .segment(&script.id)
            .ok_or_else(|| ContentError::UnknownSegment {
                id: script.id.clone(),
            })?;

        if !seen.insert(&script.id) {
            return Err(ContentError::DuplicateSegment {
                id: script.id.clone(),
            });
        }

        if script.segment_type != plan.segment_type {
            return Err(ContentError::TypeMismatch {
                id: script.id.clone(),
                expected: plan.segment_type,
                actual: script.segment_type,
            });
        }

        if script.segment_type != SegmentType::Silence
            && script.guidance_text.trim().is_empty()
        {
            return Err(ContentError::EmptyGuidanceText {
                id: script.id.clone(),
            });
        }

        for cue in &script.breath_cues {
            if cue.text.trim().is_empty() {
                return Err(ContentError::EmptyBreathCue {
                    id: script.id.clone(),
                    phase: cue.phase,
                });
            }
        }

        if let Some(ref guidance) = script.breath_guidance {
            if guidance.repetitions == 0 {
                return Err(ContentError::InvalidRepetitions {
                    id: script.id.clone(),
                    repetitions: guidance.repetitions,
                });
            }
            for cue in &guidance.cues {
                if cue.text.trim().is_empty() {
                    return Err(ContentError::EmptyBreathCue {
                        id: script.id.clone(),
                        phase: cue.phase,
                    });
                }
            }
        }
    }

    for plan in &structure.planned_segments {
        if !seen.contains(plan.id.as_str()) {
            return Err(ContentError::MissingSegment {
                id: plan.id.clone(),
            });
        }
    }

    Ok(())
}
