//! Structure validator: checks a candidate `MeditationStructure` before the
//! content stage may consume it.

use thiserror::Error;

use crate::models::MeditationStructure;

/// Allowed relative deviation between the planned segment durations and the
/// requested total duration.
pub const DURATION_TOLERANCE: f64 = 0.10;

/// Rejection reasons for a candidate structure.
#[derive(Debug, Clone, Error)]
pub enum StructureError {
    #[error("structure has an empty title")]
    EmptyTitle,

    #[error("structure has an empty theme")]
    EmptyTheme,

    #[error("total duration must be positive, got {minutes} minutes")]
    NonPositiveDuration { minutes: u32 },

    #[error("structure has no planned segments")]
    NoSegments,

    #[error("segment id '{id}' appears more than once")]
    DuplicateSegmentId { id: String },

    #[error("segment '{id}' has a non-positive duration ({seconds}s)")]
    NonPositiveSegmentDuration { id: String, seconds: f64 },

    #[error(
        "planned segment durations sum to {planned_seconds}s, \
         outside ±{tolerance_percent}% of the {total_seconds}s target"
    )]
    PlannedDurationMismatch {
        planned_seconds: f64,
        total_seconds: f64,
        tolerance_percent: f64,
    },

    #[error("structure declares {produced} minutes but the request asked for {requested}")]
    RequestDurationMismatch { requested: u32, produced: u32 },

    #[error("structure declares difficulty '{produced}' but the request asked for '{requested}'")]
    RequestDifficultyMismatch {
        requested: crate::models::Difficulty,
        produced: crate::models::Difficulty,
    },
}

/// Validate a design-stage structure.
///
/// Rejects on the first violated rule. Opening/closing placement is a policy
/// preference rather than a contract, so a structure that does not begin with
/// an opening-suited type or end with a closing-suited type is only warned
/// about.
pub fn validate_structure(structure: &MeditationStructure) -> Result<(), StructureError> {
    if structure.title.trim().is_empty() {
        return Err(StructureError::EmptyTitle);
    }
    if structure.theme.trim().is_empty() {
        return Err(StructureError::EmptyTheme);
    }
    if structure.total_duration_minutes == 0 {
        return Err(StructureError::NonPositiveDuration {
            minutes: structure.total_duration_minutes,
        });
    }
    if structure.planned_segments.is_empty() {
        return Err(StructureError::NoSegments);
    }

    let mut seen = std::collections::HashSet::new();
    for plan in &structure.planned_segments {
        if !seen.insert(plan.id.as_str()) {
            return Err(StructureError::DuplicateSegmentId {
                id: plan.id.clone(),
            });
        }
        if plan.duration_seconds <= 0.0 {
            return Err(StructureError::NonPositiveSegmentDuration {
                id: plan.id.clone(),
                seconds: plan.duration_seconds,
            });
        }
    }

    let first = &structure.planned_segments[0];
    if !first.segment_type.suits_opening() {
        log::warn!(
            "structure '{}' starts with a '{}' segment instead of an opening",
            structure.title,
            first.segment_type
        );
    }
    let last = structure
        .planned_segments
        .last()
        .expect("checked non-empty");
    if !last.segment_type.suits_closing() {
        log::warn!(
            "structure '{}' ends with a '{}' segment instead of a closing",
            structure.title,
            last.segment_type
        );
    }

    let total = structure.total_seconds();
    let planned = structure.planned_seconds();
    if (planned - total).abs() > DURATION_TOLERANCE * total {
        return Err(StructureError::PlannedDurationMismatch {
            planned_seconds: planned,
            total_seconds: total,
            tolerance_percent: DURATION_TOLERANCE * 100.0,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, SegmentPlan, SegmentType};

    fn plan(id: &str, ty: SegmentType, seconds: f64) -> SegmentPlan {
        SegmentPlan {
            id: id.to_string(),
            name: id.to_string(),
            segment_type: ty,
            duration_seconds: seconds,
        }
    }

    fn structure(segments: Vec<SegmentPlan>) -> MeditationStructure {
        MeditationStructure {
            title: "Clarity and Peace".into(),
            theme: "clarity".into(),
            difficulty: Difficulty::Beginner,
            total_duration_minutes: 10,
            background_music_style: None,
            planned_segments: segments,
            key_elements: vec![],
            breathing_pattern: None,
        }
    }

    #[test]
    fn test_accepts_balanced_outline() {
        let candidate = structure(vec![
            plan("opening", SegmentType::Opening, 60.0),
            plan("breath", SegmentType::Breathwork, 240.0),
            plan("still", SegmentType::Silence, 240.0),
            plan("closing", SegmentType::Closing, 60.0),
        ]);
        assert!(validate_structure(&candidate).is_ok());
    }

    #[test]
    fn test_rejects_empty_theme() {
        let mut candidate = structure(vec![plan("opening", SegmentType::Opening, 600.0)]);
        candidate.theme = "  ".into();
        assert!(matches!(
            validate_structure(&candidate),
            Err(StructureError::EmptyTheme)
        ));
    }

    #[test]
    fn test_rejects_empty_outline() {
        let candidate = structure(vec![]);
        assert!(matches!(
            validate_structure(&candidate),
            Err(StructureError::NoSegments)
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let candidate = structure(vec![
            plan("opening", SegmentType::Opening, 300.0),
            plan("opening", SegmentType::Closing, 300.0),
        ]);
        assert!(matches!(
            validate_structure(&candidate),
            Err(StructureError::DuplicateSegmentId { id }) if id == "opening"
        ));
    }

    #[test]
    fn test_rejects_outline_outside_tolerance() {
        // 400s planned against a 600s target is a 33% shortfall.
        let candidate = structure(vec![
            plan("opening", SegmentType::Opening, 200.0),
            plan("closing", SegmentType::Closing, 200.0),
        ]);
        assert!(matches!(
            validate_structure(&candidate),
            Err(StructureError::PlannedDurationMismatch { .. })
        ));
    }

    #[test]
    fn test_tolerance_boundary_accepted() {
        // 660s planned against 600s is exactly +10%.
        let candidate = structure(vec![
            plan("opening", SegmentType::Opening, 330.0),
            plan("closing", SegmentType::Closing, 330.0),
        ]);
        assert!(validate_structure(&candidate).is_ok());
    }
}
