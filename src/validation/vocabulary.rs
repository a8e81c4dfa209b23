//! Session assembly and the action-vocabulary enforcer.
//!
//! The table below is the enforced contract; fields the generation stages add
//! beyond it (cue sounds, fade durations, cycle cue texts) are optional
//! extensions and never required.
//!
//! | Agent | Action | Required parameters |
//! |---|---|---|
//! | voice | speak | text |
//! | voice | pause | — (reason optional) |
//! | breath | inhale_cue / exhale_cue | phase, text |
//! | breath | breathing_cycle | inhale/hold/exhale/rest seconds, repetitions |
//! | timer | silence | type ∈ {reflection, rest, transition} |
//! | timer | transition_cue | text |
//! | timer | segment_timer | duration_seconds |
//! | music | play / fade_in / fade_out / volume_change | track_id, volume |

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{
    Action, ActionTiming, ActionType, MeditationSession, MeditationStructure, MeditationTiming,
    Segment, SessionDocument, SilenceKind, TimedInstruction, TimedSegment,
};
use crate::validation::timing::{validate_timing, TimingError};

/// Rejection reasons for an action that violates the vocabulary table.
#[derive(Debug, Clone, Error)]
pub enum VocabularyError {
    #[error("segment '{segment_id}': {action} is missing required parameter '{parameter}'")]
    MissingParameter {
        segment_id: String,
        action: ActionType,
        parameter: &'static str,
    },

    #[error("segment '{segment_id}': silence type '{value}' is not one of reflection/rest/transition")]
    InvalidSilenceKind { segment_id: String, value: String },

    #[error("segment '{segment_id}': breath phase '{value}' is not recognized")]
    InvalidBreathPhase { segment_id: String, value: String },

    #[error("segment '{segment_id}': breathing_cycle parameter '{parameter}' is negative ({value})")]
    NegativeCycleParameter {
        segment_id: String,
        parameter: &'static str,
        value: f64,
    },

    #[error("segment '{segment_id}': breathing_cycle repetitions must be >= 1, got {value}")]
    InvalidRepetitions { segment_id: String, value: f64 },

    #[error("segment '{segment_id}': {action} volume {value} is outside 0.0..=1.0")]
    VolumeOutOfRange {
        segment_id: String,
        action: ActionType,
        value: f64,
    },

    #[error("segment '{segment_id}': segment_timer duration_seconds is negative ({value})")]
    NegativeTimerDuration { segment_id: String, value: f64 },
}

/// Rejection reasons for a fully-assembled session document.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

/// The parameters an action must carry per the enforced table.
pub fn required_parameters(action: ActionType) -> &'static [&'static str] {
    match action {
        ActionType::Speak | ActionType::TransitionCue => &["text"],
        ActionType::Pause => &[],
        ActionType::InhaleCue | ActionType::ExhaleCue => &["phase", "text"],
        ActionType::BreathingCycle => &[
            "inhale_seconds",
            "hold_seconds",
            "exhale_seconds",
            "rest_seconds",
            "repetitions",
        ],
        ActionType::Silence => &["type"],
        ActionType::SegmentTimer => &["duration_seconds"],
        ActionType::Play | ActionType::FadeIn | ActionType::FadeOut | ActionType::VolumeChange => {
            &["track_id", "volume"]
        }
    }
}

fn string_parameter<'a>(parameters: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn number_parameter(parameters: &Map<String, Value>, key: &str) -> Option<f64> {
    parameters
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}

/// Check one action's parameters against the vocabulary table.
///
/// `segment_id` is only used to name the offending entity in errors.
pub fn check_parameters(
    segment_id: &str,
    action: ActionType,
    parameters: &Map<String, Value>,
) -> Result<(), VocabularyError> {
    let missing = |parameter: &'static str| VocabularyError::MissingParameter {
        segment_id: segment_id.to_string(),
        action,
        parameter,
    };

    match action {
        ActionType::Speak | ActionType::TransitionCue => {
            string_parameter(parameters, "text").ok_or_else(|| missing("text"))?;
        }
        ActionType::Pause => {
            // reason is optional; nothing to enforce.
        }
        ActionType::InhaleCue | ActionType::ExhaleCue => {
            let phase = string_parameter(parameters, "phase").ok_or_else(|| missing("phase"))?;
            if phase.parse::<crate::models::BreathPhase>().is_err() {
                return Err(VocabularyError::InvalidBreathPhase {
                    segment_id: segment_id.to_string(),
                    value: phase.to_string(),
                });
            }
            string_parameter(parameters, "text").ok_or_else(|| missing("text"))?;
        }
        ActionType::BreathingCycle => {
            const PHASE_PARAMETERS: [&str; 4] = [
                "inhale_seconds",
                "hold_seconds",
                "exhale_seconds",
                "rest_seconds",
            ];
            for parameter in PHASE_PARAMETERS {
                let value =
                    number_parameter(parameters, parameter).ok_or_else(|| missing(parameter))?;
                if value < 0.0 {
                    return Err(VocabularyError::NegativeCycleParameter {
                        segment_id: segment_id.to_string(),
                        parameter,
                        value,
                    });
                }
            }
            let repetitions =
                number_parameter(parameters, "repetitions").ok_or_else(|| missing("repetitions"))?;
            if repetitions < 1.0 {
                return Err(VocabularyError::InvalidRepetitions {
                    segment_id: segment_id.to_string(),
                    value: repetitions,
                });
            }
        }
        ActionType::Silence => {
            let kind = string_parameter(parameters, "type").ok_or_else(|| missing("type"))?;
            if kind.parse::<SilenceKind>().is_err() {
                return Err(VocabularyError::InvalidSilenceKind {
                    segment_id: segment_id.to_string(),
                    value: kind.to_string(),
                });
            }
        }
        ActionType::SegmentTimer => {
            let value = number_parameter(parameters, "duration_seconds")
                .ok_or_else(|| missing("duration_seconds"))?;
            if value < 0.0 {
                return Err(VocabularyError::NegativeTimerDuration {
                    segment_id: segment_id.to_string(),
                    value,
                });
            }
        }
        ActionType::Play | ActionType::FadeIn | ActionType::FadeOut | ActionType::VolumeChange => {
            string_parameter(parameters, "track_id").ok_or_else(|| missing("track_id"))?;
            let volume =
                number_parameter(parameters, "volume").ok_or_else(|| missing("volume"))?;
            if !(0.0..=1.0).contains(&volume) {
                return Err(VocabularyError::VolumeOutOfRange {
                    segment_id: segment_id.to_string(),
                    action,
                    value: volume,
                });
            }
        }
    }

    Ok(())
}

/// Check one assembled action against the vocabulary table.
pub fn validate_action(segment_id: &str, action: &Action) -> Result<(), VocabularyError> {
    check_parameters(segment_id, action.action, &action.parameters)
}

/// Assemble the final session document from a validated timing layout.
///
/// Reproduces every timed segment and instruction in input order — no
/// reordering, no repair — attaches the session metadata, and rejects on the
/// first action whose required parameters are absent or empty.
pub fn assemble_session(
    timing: &MeditationTiming,
    structure: &MeditationStructure,
) -> Result<SessionDocument, VocabularyError> {
    let mut segments = Vec::with_capacity(timing.segments.len());

    for timed in &timing.segments {
        let mut actions = Vec::with_capacity(timed.instructions.len());
        for instruction in &timed.instructions {
            check_parameters(&timed.id, instruction.action, &instruction.parameters)?;
            actions.push(Action {
                agent: instruction.agent,
                action: instruction.action,
                timing: ActionTiming {
                    start: instruction.start_seconds,
                    duration: instruction.duration_seconds,
                },
                parameters: instruction.parameters.clone(),
            });
        }
        segments.push(Segment {
            id: timed.id.clone(),
            name: timed.title.clone(),
            segment_type: timed.segment_type,
            start_time: timed.start_seconds,
            end_time: timed.end_seconds,
            duration: timed.end_seconds - timed.start_seconds,
            actions,
        });
    }

    Ok(SessionDocument::new(MeditationSession {
        title: timing.title.clone(),
        duration: structure.total_duration_minutes * 60,
        theme: structure.theme.clone(),
        difficulty: structure.difficulty,
        background_music: structure.background_music_style.clone(),
        segments,
    }))
}

/// Re-validate an assembled session document.
///
/// Used as the final gate after assembly and as the idempotence check: a
/// document that passed assembly validates cleanly here, and running this
/// again on its output changes nothing.
pub fn validate_session(document: &SessionDocument) -> Result<(), SessionError> {
    let session = &document.session;

    // Project the wire segments back into a timing view so the
    // contiguity/total-duration rules are enforced by the same code path.
    let timing_view = MeditationTiming {
        title: session.title.clone(),
        total_duration_seconds: f64::from(session.duration),
        segments: session
            .segments
            .iter()
            .map(|segment| TimedSegment {
                id: segment.id.clone(),
                title: segment.name.clone(),
                segment_type: segment.segment_type,
                start_seconds: segment.start_time,
                end_seconds: segment.end_time,
                instructions: segment
                    .actions
                    .iter()
                    .map(|action| TimedInstruction {
                        agent: action.agent,
                        action: action.action,
                        start_seconds: action.timing.start,
                        duration_seconds: action.timing.duration,
                        parameters: action.parameters.clone(),
                    })
                    .collect(),
            })
            .collect(),
    };
    validate_timing(&timing_view)?;

    for segment in &session.segments {
        for action in &segment.actions {
            validate_action(&segment.id, action)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parameters(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_speak_requires_text() {
        let err = check_parameters("opening", ActionType::Speak, &Map::new()).unwrap_err();
        assert!(matches!(
            err,
            VocabularyError::MissingParameter {
                parameter: "text",
                ..
            }
        ));
        assert!(check_parameters(
            "opening",
            ActionType::Speak,
            &parameters(json!({"text": "Welcome."}))
        )
        .is_ok());
    }

    #[test]
    fn test_pause_reason_optional() {
        assert!(check_parameters("opening", ActionType::Pause, &Map::new()).is_ok());
    }

    #[test]
    fn test_breathing_cycle_full_parameter_set() {
        let complete = parameters(json!({
            "inhale_seconds": 4, "hold_seconds": 0, "exhale_seconds": 6,
            "rest_seconds": 2, "repetitions": 3
        }));
        assert!(check_parameters("breath", ActionType::BreathingCycle, &complete).is_ok());

        let mut negative = complete.clone();
        negative.insert("exhale_seconds".into(), json!(-1.0));
        assert!(matches!(
            check_parameters("breath", ActionType::BreathingCycle, &negative),
            Err(VocabularyError::NegativeCycleParameter {
                parameter: "exhale_seconds",
                ..
            })
        ));

        let mut zero_reps = complete.clone();
        zero_reps.insert("repetitions".into(), json!(0));
        assert!(matches!(
            check_parameters("breath", ActionType::BreathingCycle, &zero_reps),
            Err(VocabularyError::InvalidRepetitions { .. })
        ));
    }

    #[test]
    fn test_silence_kind_outside_set_rejected() {
        let err = check_parameters(
            "still",
            ActionType::Silence,
            &parameters(json!({"type": "daydream"})),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VocabularyError::InvalidSilenceKind { value, .. } if value == "daydream"
        ));
    }

    #[test]
    fn test_music_volume_bounds() {
        let loud = parameters(json!({"track_id": "ambient_calm", "volume": 1.5}));
        assert!(matches!(
            check_parameters("opening", ActionType::FadeIn, &loud),
            Err(VocabularyError::VolumeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_required_parameters_table() {
        assert_eq!(required_parameters(ActionType::Speak), &["text"]);
        assert!(required_parameters(ActionType::Pause).is_empty());
        assert_eq!(
            required_parameters(ActionType::Play),
            &["track_id", "volume"]
        );
    }

    fn fixture() -> (MeditationTiming, MeditationStructure) {
        use crate::models::{Difficulty, SegmentPlan, SegmentType};

        let timing = MeditationTiming {
            title: "Clarity".into(),
            total_duration_seconds: 120.0,
            segments: vec![TimedSegment {
                id: "opening".into(),
                title: "Opening".into(),
                segment_type: SegmentType::Opening,
                start_seconds: 0.0,
                end_seconds: 120.0,
                instructions: vec![TimedInstruction::new(ActionType::Speak, 0.0, 10.0)
                    .with_parameter("text", Value::String("Welcome.".into()))],
            }],
        };
        let structure = MeditationStructure {
            title: "Clarity".into(),
            theme: "clarity".into(),
            difficulty: Difficulty::Beginner,
            total_duration_minutes: 2,
            background_music_style: None,
            planned_segments: vec![SegmentPlan {
                id: "opening".into(),
                name: "Opening".into(),
                segment_type: SegmentType::Opening,
                duration_seconds: 120.0,
            }],
            key_elements: vec![],
            breathing_pattern: None,
        };
        (timing, structure)
    }

    #[test]
    fn test_assembly_preserves_order_and_metadata() {
        let (timing, structure) = fixture();
        let document = assemble_session(&timing, &structure).unwrap();
        let session = &document.session;
        assert_eq!(session.duration, 120);
        assert_eq!(session.theme, "clarity");
        assert_eq!(session.segments.len(), 1);
        assert_eq!(session.segments[0].actions[0].action, ActionType::Speak);
        assert_eq!(session.segments[0].duration, 120.0);
    }

    #[test]
    fn test_assembly_rejects_missing_parameter() {
        let (mut timing, structure) = fixture();
        timing.segments[0].instructions[0].parameters.clear();
        let err = assemble_session(&timing, &structure).unwrap_err();
        assert!(matches!(
            err,
            VocabularyError::MissingParameter {
                parameter: "text",
                ..
            }
        ));
    }

    #[test]
    fn test_accepted_session_revalidates_cleanly() {
        let (timing, structure) = fixture();
        let document = assemble_session(&timing, &structure).unwrap();
        // Idempotent: an accepted document produces zero rejections, twice.
        validate_session(&document).unwrap();
        validate_session(&document).unwrap();
    }
}
