//! Timing-consistency validator: segment contiguity, exact total duration,
//! and in-segment instruction ordering.

use thiserror::Error;

use crate::models::{ActionType, AgentKind, MeditationTiming};

/// Tolerance for instruction-boundary float comparisons. Segment boundaries
/// themselves are compared exactly: the calculator shares boundary values
/// between adjacent segments, so equality is by construction.
const INSTRUCTION_EPSILON: f64 = 1e-6;

/// Rejection reasons for a candidate timing layout.
#[derive(Debug, Clone, Error)]
pub enum TimingError {
    #[error("timing has no segments")]
    NoSegments,

    #[error("first segment '{id}' starts at {start_seconds}s, expected 0")]
    FirstSegmentNotAtZero { id: String, start_seconds: f64 },

    #[error("segment '{id}' ends ({end_seconds}s) before it starts ({start_seconds}s)")]
    NegativeSpan {
        id: String,
        start_seconds: f64,
        end_seconds: f64,
    },

    #[error(
        "segments '{prev_id}' and '{next_id}' are not contiguous: \
         {end_seconds}s vs {start_seconds}s"
    )]
    Discontiguous {
        prev_id: String,
        next_id: String,
        end_seconds: f64,
        start_seconds: f64,
    },

    #[error(
        "last segment ends at {actual_seconds}s, expected exactly {expected_seconds}s"
    )]
    TotalDurationMismatch {
        expected_seconds: f64,
        actual_seconds: f64,
    },

    #[error(
        "segment '{segment_id}': {action} instruction [{start_seconds}s, {end_seconds}s) \
         falls outside the segment span"
    )]
    InstructionOutOfBounds {
        segment_id: String,
        action: ActionType,
        start_seconds: f64,
        end_seconds: f64,
    },

    #[error("segment '{segment_id}': overlapping {agent} instructions ({action})")]
    SameAgentOverlap {
        segment_id: String,
        agent: AgentKind,
        action: ActionType,
    },

    #[error("segment '{segment_id}': {action} instruction is addressed to {actual}, expected {expected}")]
    WrongAgent {
        segment_id: String,
        action: ActionType,
        expected: AgentKind,
        actual: AgentKind,
    },

    #[error(
        "script needs {required_seconds}s but only {total_seconds}s are available \
         after trimming all adjustable padding"
    )]
    ScriptOverflow {
        required_seconds: f64,
        total_seconds: f64,
    },

    #[error("no script segment for planned segment '{id}'")]
    MissingScript { id: String },
}

/// Validate an orchestration-stage timing layout.
///
/// Enforces: segments contiguous and non-overlapping, first segment at 0,
/// last segment ending exactly at the declared total; instructions bounded by
/// their segment; same-agent instructions strictly ordered without overlap
/// (different agents may overlap — parallel playback is data, not an error).
pub fn validate_timing(timing: &MeditationTiming) -> Result<(), TimingError> {
    let first = timing.segments.first().ok_or(TimingError::NoSegments)?;

    if first.start_seconds != 0.0 {
        return Err(TimingError::FirstSegmentNotAtZero {
            id: first.id.clone(),
            start_seconds: first.start_seconds,
        });
    }

    for pair in timing.segments.windows(2) {
        if pair[0].end_seconds != pair[1].start_seconds {
            return Err(TimingError::Discontiguous {
                prev_id: pair[0].id.clone(),
                next_id: pair[1].id.clone(),
                end_seconds: pair[0].end_seconds,
                start_seconds: pair[1].start_seconds,
            });
        }
    }

    let last = timing.segments.last().expect("checked non-empty");
    if last.end_seconds != timing.total_duration_seconds {
        return Err(TimingError::TotalDurationMismatch {
            expected_seconds: timing.total_duration_seconds,
            actual_seconds: last.end_seconds,
        });
    }

    for segment in &timing.segments {
        if segment.end_seconds < segment.start_seconds {
            return Err(TimingError::NegativeSpan {
                id: segment.id.clone(),
                start_seconds: segment.start_seconds,
                end_seconds: segment.end_seconds,
            });
        }

        // Track the playback frontier per agent for the same-agent ordering rule.
        let mut frontier: [(AgentKind, f64); 4] = [
            (AgentKind::Voice, segment.start_seconds),
            (AgentKind::Breath, segment.start_seconds),
            (AgentKind::Timer, segment.start_seconds),
            (AgentKind::Music, segment.start_seconds),
        ];

        for instruction in &segment.instructions {
            let expected = instruction.action.agent();
            if instruction.agent != expected {
                return Err(TimingError::WrongAgent {
                    segment_id: segment.id.clone(),
                    action: instruction.action,
                    expected,
                    actual: instruction.agent,
                });
            }

            let start = instruction.start_seconds;
            let end = instruction.end_seconds();
            if start < segment.start_seconds - INSTRUCTION_EPSILON
                || end > segment.end_seconds + INSTRUCTION_EPSILON
                || instruction.duration_seconds < 0.0
            {
                return Err(TimingError::InstructionOutOfBounds {
                    segment_id: segment.id.clone(),
                    action: instruction.action,
                    start_seconds: start,
                    end_seconds: end,
                });
            }

            let slot = frontier
                .iter_mut()
                .find(|(agent, _)| *agent == instruction.agent)
                .expect("all agents tracked");
            if start < slot.1 - INSTRUCTION_EPSILON {
                return Err(TimingError::SameAgentOverlap {
                    segment_id: segment.id.clone(),
                    agent: instruction.agent,
                    action: instruction.action,
                });
            }
            slot.1 = slot.1.max(end);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SegmentType, TimedInstruction, TimedSegment};
    use serde_json::json;

    fn speak(start: f64, duration: f64) -> TimedInstruction {
        TimedInstruction::new(ActionType::Speak, start, duration)
            .with_parameter("text", json!("Breathe."))
    }

    fn segment(id: &str, start: f64, end: f64, instructions: Vec<TimedInstruction>) -> TimedSegment {
        TimedSegment {
            id: id.to_string(),
            title: id.to_string(),
            segment_type: SegmentType::Guidance,
            start_seconds: start,
            end_seconds: end,
            instructions,
        }
    }

    fn timing(total: f64, segments: Vec<TimedSegment>) -> MeditationTiming {
        MeditationTiming {
            title: "Clarity".into(),
            total_duration_seconds: total,
            segments,
        }
    }

    #[test]
    fn test_accepts_contiguous_layout() {
        let candidate = timing(
            120.0,
            vec![
                segment("a", 0.0, 60.0, vec![speak(0.0, 10.0), speak(10.0, 10.0)]),
                segment("b", 60.0, 120.0, vec![speak(60.0, 20.0)]),
            ],
        );
        assert!(validate_timing(&candidate).is_ok());
    }

    #[test]
    fn test_rejects_nonzero_session_start() {
        let candidate = timing(60.0, vec![segment("a", 5.0, 60.0, vec![])]);
        assert!(matches!(
            validate_timing(&candidate),
            Err(TimingError::FirstSegmentNotAtZero { .. })
        ));
    }

    #[test]
    fn test_rejects_gap_between_segments() {
        let candidate = timing(
            120.0,
            vec![
                segment("a", 0.0, 55.0, vec![]),
                segment("b", 60.0, 120.0, vec![]),
            ],
        );
        assert!(matches!(
            validate_timing(&candidate),
            Err(TimingError::Discontiguous { .. })
        ));
    }

    #[test]
    fn test_rejects_total_mismatch() {
        let candidate = timing(120.0, vec![segment("a", 0.0, 110.0, vec![])]);
        assert!(matches!(
            validate_timing(&candidate),
            Err(TimingError::TotalDurationMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_instruction_outside_segment() {
        let candidate = timing(60.0, vec![segment("a", 0.0, 60.0, vec![speak(50.0, 20.0)])]);
        assert!(matches!(
            validate_timing(&candidate),
            Err(TimingError::InstructionOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_same_agent_overlap() {
        let candidate = timing(
            60.0,
            vec![segment("a", 0.0, 60.0, vec![speak(0.0, 30.0), speak(20.0, 10.0)])],
        );
        assert!(matches!(
            validate_timing(&candidate),
            Err(TimingError::SameAgentOverlap { .. })
        ));
    }

    #[test]
    fn test_allows_cross_agent_overlap() {
        let fade = TimedInstruction::new(ActionType::FadeIn, 0.0, 10.0)
            .with_parameter("track_id", json!("ambient_calm"))
            .with_parameter("volume", json!(0.2));
        let candidate = timing(
            60.0,
            vec![segment("a", 0.0, 60.0, vec![fade, speak(0.0, 30.0)])],
        );
        assert!(validate_timing(&candidate).is_ok());
    }
}
