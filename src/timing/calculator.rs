//! Timeline layout: turns an authored script into an exact timeline.
//!
//! Segments are laid out back-to-back from 0 to exactly
//! `total_duration_minutes * 60`. Spoken durations are estimated from word
//! count at a fixed speaking rate; breathing cycles use their declared phase
//! seconds times the repetition count; the gap between the estimated script
//! length and the target duration is closed by stretching or trimming silence
//! padding, silence-typed segments first. A script that still does not fit
//! after every adjustable pad is trimmed to zero is a hard failure.

use serde_json::json;

use crate::models::{
    ActionType, BreathPhase, MeditationContent, MeditationStructure, MeditationTiming,
    ScriptSegment, SegmentType, SilenceKind, TimedInstruction, TimedSegment,
};
use crate::timing::breathing::NATURAL_PATTERN;
use crate::utilities::string_utils::word_count;
use crate::validation::timing::TimingError;

/// Fixed speaking rate used for spoken-duration estimates.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Seconds per spoken word at the fixed rate (0.4 s/word).
pub const SECONDS_PER_WORD: f64 = 60.0 / WORDS_PER_MINUTE;

/// Floor for any non-empty spoken instruction.
const MIN_SPEECH_SECONDS: f64 = 1.0;

/// Music fade length, capped at half the enclosing segment.
const FADE_SECONDS: f64 = 10.0;

const DEFAULT_MUSIC_VOLUME: f64 = 0.3;

/// Estimated playback duration of spoken text.
///
/// An estimate, not a hard contract: the executor's voice may run faster or
/// slower; padding absorbs the difference.
pub fn speech_seconds(text: &str) -> f64 {
    let words = word_count(text);
    if words == 0 {
        0.0
    } else {
        (words as f64 * SECONDS_PER_WORD).max(MIN_SPEECH_SECONDS)
    }
}

/// One not-yet-placed instruction: an action, a duration, and its parameters.
struct DraftInstruction {
    action: ActionType,
    duration_seconds: f64,
    parameters: serde_json::Map<String, serde_json::Value>,
}

impl DraftInstruction {
    fn new(action: ActionType, duration_seconds: f64, parameters: serde_json::Value) -> Self {
        Self {
            action,
            duration_seconds,
            parameters: parameters
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// A segment's instruction sequence before absolute times are assigned.
struct SegmentDraft {
    id: String,
    title: String,
    segment_type: SegmentType,
    sequence: Vec<DraftInstruction>,
    /// Index of the adjustable silence instruction, if the segment has one.
    pad_index: Option<usize>,
}

impl SegmentDraft {
    fn pad_seconds(&self) -> f64 {
        self.pad_index
            .map(|i| self.sequence[i].duration_seconds)
            .unwrap_or(0.0)
    }

    fn set_pad_seconds(&mut self, seconds: f64) {
        if let Some(i) = self.pad_index {
            self.sequence[i].duration_seconds = seconds;
        }
    }

    /// Fixed script length: everything except the adjustable pad.
    fn content_seconds(&self) -> f64 {
        self.sequence
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.pad_index)
            .map(|(_, instr)| instr.duration_seconds)
            .sum()
    }

    fn natural_seconds(&self) -> f64 {
        self.content_seconds() + self.pad_seconds()
    }

    /// Append an adjustable pad of the given kind if none exists yet.
    fn ensure_pad(&mut self, kind: SilenceKind) {
        if self.pad_index.is_none() {
            self.sequence.push(DraftInstruction::new(
                ActionType::Silence,
                0.0,
                json!({"type": kind.as_str()}),
            ));
            self.pad_index = Some(self.sequence.len() - 1);
        }
    }
}

fn draft_segment(structure: &MeditationStructure, script: &ScriptSegment, plan_seconds: f64) -> SegmentDraft {
    let pattern = structure.breathing_pattern.unwrap_or(NATURAL_PATTERN);
    let mut sequence = Vec::new();
    let mut pad_index = None;

    if !script.opening_text.trim().is_empty() {
        sequence.push(DraftInstruction::new(
            ActionType::Speak,
            speech_seconds(&script.opening_text),
            json!({"text": script.opening_text}),
        ));
    }

    if let Some(ref guidance) = script.breath_guidance {
        let mut parameters = json!({
            "inhale_seconds": guidance.pattern.inhale_seconds,
            "hold_seconds": guidance.pattern.hold_seconds,
            "exhale_seconds": guidance.pattern.exhale_seconds,
            "rest_seconds": guidance.pattern.rest_seconds,
            "repetitions": guidance.repetitions,
        });
        for cue in &guidance.cues {
            let key = match cue.phase {
                BreathPhase::Inhale => Some("inhale_cue"),
                BreathPhase::Exhale => Some("exhale_cue"),
                BreathPhase::Hold | BreathPhase::Rest => None,
            };
            if let Some(key) = key {
                parameters[key] = json!(cue.text);
            }
        }
        sequence.push(DraftInstruction::new(
            ActionType::BreathingCycle,
            guidance.total_seconds(),
            parameters,
        ));
    } else {
        for cue in &script.breath_cues {
            let spoken = speech_seconds(&cue.text);
            let (action, phase_seconds) = match cue.phase {
                BreathPhase::Inhale => (ActionType::InhaleCue, pattern.inhale_seconds),
                BreathPhase::Exhale => (ActionType::ExhaleCue, pattern.exhale_seconds),
                // Hold/rest cues have no breath action; the voice carries them.
                BreathPhase::Hold => (ActionType::Speak, pattern.hold_seconds),
                BreathPhase::Rest => (ActionType::Speak, pattern.rest_seconds),
            };
            let mut parameters = json!({"text": cue.text});
            if action != ActionType::Speak {
                parameters["phase"] = json!(cue.phase.as_str());
                if let Some(ref sound) = cue.sound {
                    parameters["sound"] = json!(sound);
                }
            }
            sequence.push(DraftInstruction::new(
                action,
                spoken.max(phase_seconds),
                parameters,
            ));
        }
    }

    if !script.guidance_text.trim().is_empty() {
        sequence.push(DraftInstruction::new(
            ActionType::Speak,
            speech_seconds(&script.guidance_text),
            json!({"text": script.guidance_text}),
        ));
    }

    // Adjustable stillness: explicit on any segment, implicit for
    // silence-typed segments (which fill the rest of their planned span).
    if script.segment_type == SegmentType::Silence {
        let content: f64 = sequence.iter().map(|i| i.duration_seconds).sum();
        let pad = script
            .silence_seconds
            .unwrap_or((plan_seconds - content).max(0.0));
        sequence.push(DraftInstruction::new(
            ActionType::Silence,
            pad,
            json!({"type": SilenceKind::Reflection.as_str()}),
        ));
        pad_index = Some(sequence.len() - 1);
    } else if let Some(silence) = script.silence_seconds {
        sequence.push(DraftInstruction::new(
            ActionType::Silence,
            silence.max(0.0),
            json!({"type": SilenceKind::Rest.as_str()}),
        ));
        pad_index = Some(sequence.len() - 1);
    }

    if !script.closing_text.trim().is_empty() {
        sequence.push(DraftInstruction::new(
            ActionType::Speak,
            speech_seconds(&script.closing_text),
            json!({"text": script.closing_text}),
        ));
    }

    if !script.transition_text.trim().is_empty() {
        sequence.push(DraftInstruction::new(
            ActionType::TransitionCue,
            speech_seconds(&script.transition_text),
            json!({"text": script.transition_text}),
        ));
    }

    SegmentDraft {
        id: script.id.clone(),
        title: script.title.clone(),
        segment_type: script.segment_type,
        sequence,
        pad_index,
    }
}

/// Close the gap between the natural script length and the target duration.
///
/// Stretching goes to silence-typed segments when any exist, otherwise to a
/// trailing transition pad on every segment. Trimming drains silence-typed
/// pads first, then the rest; if the fixed script content alone exceeds the
/// target, that is a hard failure.
fn adjust_padding(drafts: &mut [SegmentDraft], total_seconds: f64) -> Result<(), TimingError> {
    let natural: f64 = drafts.iter().map(SegmentDraft::natural_seconds).sum();
    let gap = total_seconds - natural;

    if gap > 0.0 {
        let silence_indices: Vec<usize> = drafts
            .iter()
            .enumerate()
            .filter(|(_, d)| d.segment_type == SegmentType::Silence)
            .map(|(i, _)| i)
            .collect();
        let targets = if silence_indices.is_empty() {
            (0..drafts.len()).collect::<Vec<_>>()
        } else {
            silence_indices
        };
        let share = gap / targets.len() as f64;
        for &i in &targets {
            drafts[i].ensure_pad(SilenceKind::Transition);
            let pad = drafts[i].pad_seconds();
            drafts[i].set_pad_seconds(pad + share);
        }
        return Ok(());
    }

    let mut deficit = -gap;
    if deficit == 0.0 {
        return Ok(());
    }

    // Silence-typed segments give up padding first.
    for silence_pass in [true, false] {
        for draft in drafts.iter_mut() {
            if deficit <= 0.0 {
                break;
            }
            if (draft.segment_type == SegmentType::Silence) != silence_pass {
                continue;
            }
            let pad = draft.pad_seconds();
            if pad > 0.0 {
                let take = pad.min(deficit);
                draft.set_pad_seconds(pad - take);
                deficit -= take;
            }
        }
    }

    if deficit > 1e-9 {
        let required: f64 = drafts.iter().map(SegmentDraft::content_seconds).sum();
        return Err(TimingError::ScriptOverflow {
            required_seconds: required,
            total_seconds,
        });
    }
    Ok(())
}

fn music_track_id(style: &str) -> String {
    let slug: String = style
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "ambient_peace".to_string()
    } else {
        slug
    }
}

/// Compute the fully-timed layout for an authored script.
///
/// Assumes `content` already passed the content completeness gate for
/// `structure`; segment order follows the structure's outline.
pub fn calculate_timing(
    structure: &MeditationStructure,
    content: &MeditationContent,
) -> Result<MeditationTiming, TimingError> {
    if structure.planned_segments.is_empty() {
        return Err(TimingError::NoSegments);
    }
    let total_seconds = structure.total_seconds();

    let mut drafts = Vec::with_capacity(structure.planned_segments.len());
    for plan in &structure.planned_segments {
        let script = content
            .segment(&plan.id)
            .ok_or_else(|| TimingError::MissingScript {
                id: plan.id.clone(),
            })?;
        drafts.push(draft_segment(structure, script, plan.duration_seconds));
    }

    adjust_padding(&mut drafts, total_seconds)?;

    let music = structure.background_music_style.as_deref().map(|style| {
        json!({
            "track_id": music_track_id(style),
            "volume": DEFAULT_MUSIC_VOLUME,
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    });

    let count = drafts.len();
    let mut segments = Vec::with_capacity(count);
    let mut cursor = 0.0_f64;

    for (index, draft) in drafts.iter_mut().enumerate() {
        let start = cursor;
        let end = if index == count - 1 {
            total_seconds
        } else {
            start + draft.natural_seconds()
        };

        // The final boundary is pinned; fold any float drift into its pad.
        if index == count - 1 && draft.pad_index.is_some() {
            let pad = (end - start - draft.content_seconds()).max(0.0);
            draft.set_pad_seconds(pad);
        }

        let span = end - start;
        let mut instructions = Vec::with_capacity(draft.sequence.len() + 2);

        if index == 0 {
            if let Some(ref parameters) = music {
                let fade = FADE_SECONDS.min(span / 2.0);
                let mut fade_in = TimedInstruction::new(ActionType::FadeIn, start, fade);
                fade_in.parameters = parameters.clone();
                instructions.push(fade_in);
            }
        }

        let mut offset = start;
        for instr in &draft.sequence {
            let mut timed =
                TimedInstruction::new(instr.action, offset, instr.duration_seconds);
            timed.parameters = instr.parameters.clone();
            instructions.push(timed);
            offset += instr.duration_seconds;
        }

        if index == count - 1 {
            if let Some(ref parameters) = music {
                let fade = FADE_SECONDS.min(span / 2.0);
                let mut fade_out =
                    TimedInstruction::new(ActionType::FadeOut, end - fade, fade);
                fade_out.parameters = parameters.clone();
                instructions.push(fade_out);
            }
        }

        segments.push(TimedSegment {
            id: draft.id.clone(),
            title: draft.title.clone(),
            segment_type: draft.segment_type,
            start_seconds: start,
            end_seconds: end,
            instructions,
        });
        cursor = end;
    }

    Ok(MeditationTiming {
        title: content.title.clone(),
        total_duration_seconds: total_seconds,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BreathGuidance, BreathPattern, Difficulty, SegmentPlan};
    use crate::validation::timing::validate_timing;

    fn plan(id: &str, ty: SegmentType, seconds: f64) -> SegmentPlan {
        SegmentPlan {
            id: id.to_string(),
            name: id.to_string(),
            segment_type: ty,
            duration_seconds: seconds,
        }
    }

    fn script(id: &str, ty: SegmentType, guidance: &str) -> ScriptSegment {
        ScriptSegment {
            id: id.to_string(),
            title: id.to_string(),
            segment_type: ty,
            opening_text: String::new(),
            guidance_text: guidance.to_string(),
            transition_text: String::new(),
            closing_text: String::new(),
            breath_cues: vec![],
            breath_guidance: None,
            silence_seconds: None,
        }
    }

    fn fixture(minutes: u32) -> (MeditationStructure, MeditationContent) {
        let structure = MeditationStructure {
            title: "Clarity and Peace".into(),
            theme: "clarity".into(),
            difficulty: Difficulty::Beginner,
            total_duration_minutes: minutes,
            background_music_style: Some("Gentle ambient tones".into()),
            planned_segments: vec![
                plan("opening", SegmentType::Opening, 30.0),
                plan("breath", SegmentType::Breathwork, 120.0),
                plan("still", SegmentType::Silence, 60.0),
                plan("closing", SegmentType::Closing, 30.0),
            ],
            key_elements: vec![],
            breathing_pattern: Some(BreathPattern {
                inhale_seconds: 4.0,
                hold_seconds: 0.0,
                exhale_seconds: 6.0,
                rest_seconds: 2.0,
            }),
        };
        let mut breath = script("breath", SegmentType::Breathwork, "Follow your breath.");
        breath.breath_guidance = Some(BreathGuidance {
            pattern: structure.breathing_pattern.unwrap(),
            repetitions: 5,
            cues: vec![],
        });
        let content = MeditationContent {
            title: structure.title.clone(),
            theme: structure.theme.clone(),
            difficulty: structure.difficulty,
            segments: vec![
                script("opening", SegmentType::Opening, "Welcome to this practice. Settle in."),
                breath,
                script("still", SegmentType::Silence, ""),
                script("closing", SegmentType::Closing, "Gently open your eyes."),
            ],
        };
        (structure, content)
    }

    #[test]
    fn test_speech_rate() {
        // 150 words at 150 wpm is exactly one minute.
        let text = vec!["word"; 150].join(" ");
        assert!((speech_seconds(&text) - 60.0).abs() < 1e-9);
        assert_eq!(speech_seconds(""), 0.0);
        // A single word is clamped to the minimum.
        assert_eq!(speech_seconds("breathe"), 1.0);
    }

    #[test]
    fn test_layout_is_exact_and_contiguous() {
        let (structure, content) = fixture(4);
        let timing = calculate_timing(&structure, &content).unwrap();
        assert_eq!(timing.segments[0].start_seconds, 0.0);
        assert_eq!(timing.segments.last().unwrap().end_seconds, 240.0);
        for pair in timing.segments.windows(2) {
            assert_eq!(pair[0].end_seconds, pair[1].start_seconds);
        }
        validate_timing(&timing).unwrap();
    }

    #[test]
    fn test_silence_absorbs_the_gap() {
        let (structure, content) = fixture(4);
        let timing = calculate_timing(&structure, &content).unwrap();
        let still = timing
            .segments
            .iter()
            .find(|s| s.id == "still")
            .unwrap();
        // The short script leaves most of the 240s to the silence segment.
        assert!(still.duration_seconds() > 100.0);
        let pad = still
            .instructions
            .iter()
            .find(|i| i.action == ActionType::Silence)
            .unwrap();
        assert_eq!(pad.parameters["type"], "reflection");
    }

    #[test]
    fn test_stretch_without_silence_segments_appends_pads() {
        let structure = MeditationStructure {
            title: "Short".into(),
            theme: "rest".into(),
            difficulty: Difficulty::Beginner,
            total_duration_minutes: 2,
            background_music_style: None,
            planned_segments: vec![
                plan("opening", SegmentType::Opening, 60.0),
                plan("closing", SegmentType::Closing, 60.0),
            ],
            key_elements: vec![],
            breathing_pattern: None,
        };
        let content = MeditationContent {
            title: "Short".into(),
            theme: "rest".into(),
            difficulty: Difficulty::Beginner,
            segments: vec![
                script("opening", SegmentType::Opening, "Welcome."),
                script("closing", SegmentType::Closing, "Goodbye."),
            ],
        };
        let timing = calculate_timing(&structure, &content).unwrap();
        assert_eq!(timing.segments.last().unwrap().end_seconds, 120.0);
        for segment in &timing.segments {
            let pad = segment
                .instructions
                .iter()
                .find(|i| i.action == ActionType::Silence)
                .expect("stretch should add a pad to every segment");
            assert_eq!(pad.parameters["type"], "transition");
        }
        validate_timing(&timing).unwrap();
    }

    #[test]
    fn test_overflowing_script_is_a_hard_failure() {
        let (mut structure, mut content) = fixture(4);
        structure.total_duration_minutes = 1;
        // 300 words of guidance is ~120s of speech against a 60s target.
        let long_text = vec!["word"; 300].join(" ");
        for segment in &mut content.segments {
            if segment.segment_type != SegmentType::Silence {
                segment.guidance_text = long_text.clone();
            }
        }
        let err = calculate_timing(&structure, &content).unwrap_err();
        assert!(matches!(err, TimingError::ScriptOverflow { .. }));
    }

    #[test]
    fn test_music_overlay_bounds() {
        let (structure, content) = fixture(4);
        let timing = calculate_timing(&structure, &content).unwrap();
        let first = &timing.segments[0];
        let fade_in = first
            .instructions
            .iter()
            .find(|i| i.action == ActionType::FadeIn)
            .unwrap();
        assert_eq!(fade_in.start_seconds, 0.0);
        assert_eq!(fade_in.parameters["track_id"], "gentle_ambient_tones");
        let last = timing.segments.last().unwrap();
        let fade_out = last
            .instructions
            .iter()
            .find(|i| i.action == ActionType::FadeOut)
            .unwrap();
        assert!((fade_out.end_seconds() - 240.0).abs() < 1e-6);
    }
}
