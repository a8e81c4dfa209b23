//! Custom tools for meditation session generation.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::base_tool::{number_arg, string_arg, BaseTool, ToolError};
use crate::models::{ActionType, SegmentType};
use crate::timing::breathing::{describe_pattern, fit_cycles, named_pattern, NATURAL_PATTERN};
use crate::validation::validate_session;

// ---------------------------------------------------------------------------
// MeditationTimingTool
// ---------------------------------------------------------------------------

/// Calculates segment start/end times from a list of names and durations.
#[derive(Debug, Default)]
pub struct MeditationTimingTool;

impl BaseTool for MeditationTimingTool {
    fn name(&self) -> &str {
        "Meditation Timing Calculator"
    }

    fn description(&self) -> &str {
        "Calculates precise timing for meditation segments, breathing patterns, and transitions"
    }

    fn args_schema(&self) -> Value {
        json!({
            "total_duration": {"type": "number", "description": "Total duration in minutes"},
            "segments": {"type": "array", "description": "Segment names and relative durations"},
        })
    }

    fn run(&self, args: &HashMap<String, Value>) -> Result<Value, ToolError> {
        const TOOL: &str = "meditation_timing";
        let total_minutes = number_arg(TOOL, args, "total_duration")?;
        let segments = args
            .get("segments")
            .and_then(Value::as_array)
            .ok_or(ToolError::MissingArgument {
                tool: TOOL,
                argument: "segments",
            })?;

        let mut plan = Vec::with_capacity(segments.len());
        let mut current = 0.0_f64;
        for (index, segment) in segments.iter().enumerate() {
            let duration = segment
                .get("duration")
                .and_then(Value::as_f64)
                .unwrap_or(60.0);
            let name = segment
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Segment {}", index + 1));
            plan.push(json!({
                "name": name,
                "start_time": current,
                "end_time": current + duration,
                "duration": duration,
            }));
            current += duration;
        }

        Ok(json!({
            "total_duration": total_minutes * 60.0,
            "segments": plan,
        }))
    }
}

// ---------------------------------------------------------------------------
// BreathingPatternTool
// ---------------------------------------------------------------------------

/// Generates breathing patterns for different meditation techniques.
#[derive(Debug, Default)]
pub struct BreathingPatternTool;

impl BaseTool for BreathingPatternTool {
    fn name(&self) -> &str {
        "Breathing Pattern Generator"
    }

    fn description(&self) -> &str {
        "Generates breathing patterns for different meditation techniques"
    }

    fn args_schema(&self) -> Value {
        json!({
            "pattern_type": {"type": "string", "description": "4-7-8, box, natural or calm"},
            "duration": {"type": "number", "description": "Window in seconds to fill with cycles"},
        })
    }

    fn run(&self, args: &HashMap<String, Value>) -> Result<Value, ToolError> {
        const TOOL: &str = "breathing_pattern";
        let pattern_type = string_arg(TOOL, args, "pattern_type")?;
        let window = number_arg(TOOL, args, "duration")?;

        let pattern = named_pattern(pattern_type).unwrap_or(NATURAL_PATTERN);
        let cycles = fit_cycles(&pattern, window);

        Ok(json!({
            "pattern": {
                "inhale": pattern.inhale_seconds,
                "hold": pattern.hold_seconds,
                "exhale": pattern.exhale_seconds,
                "rest": pattern.rest_seconds,
            },
            "cycles": cycles,
            "total_duration": pattern.cycle_seconds() * f64::from(cycles),
            "instructions": describe_pattern(&pattern, cycles),
        }))
    }
}

// ---------------------------------------------------------------------------
// MeditationContentTool
// ---------------------------------------------------------------------------

/// Provides difficulty-keyed script templates for the content stage.
#[derive(Debug, Default)]
pub struct MeditationContentTool;

fn template(segment: SegmentType, difficulty: &str) -> &'static str {
    match (segment, difficulty) {
        (SegmentType::Opening, "intermediate") => {
            "Welcome. Take a moment to arrive fully in this space, releasing the outside world."
        }
        (SegmentType::Opening, "advanced") => {
            "Welcome to this practice. Begin by establishing your intention for this session."
        }
        (SegmentType::Opening, _) => {
            "Welcome to this peaceful meditation. Find a comfortable position and allow yourself to settle."
        }
        (SegmentType::Guidance, "intermediate") => {
            "Bring awareness to the present moment, observing without judgment."
        }
        (SegmentType::Guidance, "advanced") => {
            "Cultivate deep awareness of each sensation as it arises and passes."
        }
        (SegmentType::Guidance, _) => "Notice your breath flowing in and out naturally.",
        (SegmentType::Closing, "intermediate") => {
            "Begin to transition back, carrying this sense of calm with you."
        }
        (SegmentType::Closing, "advanced") => {
            "Integrate this awareness as you return to your daily activities."
        }
        (SegmentType::Closing, _) => {
            "Slowly bring your awareness back. Wiggle your fingers and toes. Open your eyes when ready."
        }
        _ => "Take a moment to be present.",
    }
}

impl BaseTool for MeditationContentTool {
    fn name(&self) -> &str {
        "Meditation Content Generator"
    }

    fn description(&self) -> &str {
        "Generates meditation content templates and voice scripts"
    }

    fn args_schema(&self) -> Value {
        json!({
            "theme": {"type": "string"},
            "difficulty": {"type": "string", "description": "beginner, intermediate or advanced"},
        })
    }

    fn run(&self, args: &HashMap<String, Value>) -> Result<Value, ToolError> {
        const TOOL: &str = "meditation_content";
        let theme = string_arg(TOOL, args, "theme")?;
        let difficulty = string_arg(TOOL, args, "difficulty")?;

        Ok(json!({
            "opening": template(SegmentType::Opening, difficulty),
            "guidance": template(SegmentType::Guidance, difficulty),
            "closing": template(SegmentType::Closing, difficulty),
            "theme": theme,
        }))
    }
}

// ---------------------------------------------------------------------------
// ActionParameterGeneratorTool
// ---------------------------------------------------------------------------

/// Generates default parameters for an action in a given segment context.
///
/// Results are cached per `(action, segment_type)` pair; the same combination
/// always yields the same parameters within a process.
#[derive(Debug, Default)]
pub struct ActionParameterGeneratorTool {
    cache: Mutex<HashMap<(String, String), Value>>,
}

fn default_voice_text(segment: SegmentType) -> &'static str {
    match segment {
        SegmentType::Opening => "Welcome to this meditation. Find a comfortable position and allow yourself to settle.",
        SegmentType::Breathwork => "Bring your attention to your breath and notice its natural rhythm.",
        SegmentType::Closing => "Gently wiggle your fingers and toes, and when you're ready, open your eyes.",
        _ => "Allow your awareness to rest gently in the present moment.",
    }
}

fn default_breath_cue(segment: SegmentType, phase: &str) -> &'static str {
    match (segment, phase) {
        (SegmentType::Breathwork, "inhale") => "Inhale deeply through your nose",
        (SegmentType::Breathwork, _) => "Exhale completely through your mouth",
        (_, "inhale") => "Breathe in deeply",
        (_, _) => "Release and let go",
    }
}

impl ActionParameterGeneratorTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate(&self, action: ActionType, segment: SegmentType) -> Value {
        match action {
            ActionType::Speak => json!({"text": default_voice_text(segment)}),
            ActionType::Pause => json!({"reason": "Allow for reflection"}),
            ActionType::InhaleCue => json!({
                "phase": "inhale",
                "text": default_breath_cue(segment, "inhale"),
            }),
            ActionType::ExhaleCue => json!({
                "phase": "exhale",
                "text": default_breath_cue(segment, "exhale"),
            }),
            ActionType::BreathingCycle => json!({
                "inhale_seconds": NATURAL_PATTERN.inhale_seconds,
                "hold_seconds": NATURAL_PATTERN.hold_seconds,
                "exhale_seconds": NATURAL_PATTERN.exhale_seconds,
                "rest_seconds": NATURAL_PATTERN.rest_seconds,
                "repetitions": 3,
                "inhale_cue": default_breath_cue(segment, "inhale"),
                "exhale_cue": default_breath_cue(segment, "exhale"),
            }),
            ActionType::Silence => json!({"type": "reflection"}),
            ActionType::TransitionCue => json!({"text": "Transitioning"}),
            ActionType::SegmentTimer => json!({"duration_seconds": 60.0}),
            ActionType::Play | ActionType::FadeIn | ActionType::FadeOut
            | ActionType::VolumeChange => json!({
                "track_id": "ambient_peace",
                "volume": 0.3,
            }),
        }
    }
}

impl BaseTool for ActionParameterGeneratorTool {
    fn name(&self) -> &str {
        "Action Parameter Generator"
    }

    fn description(&self) -> &str {
        "Generates appropriate parameters for different action types in a meditation session"
    }

    fn args_schema(&self) -> Value {
        json!({
            "action_type": {"type": "string"},
            "segment_type": {"type": "string"},
        })
    }

    fn run(&self, args: &HashMap<String, Value>) -> Result<Value, ToolError> {
        const TOOL: &str = "action_parameter_generator";
        let action_name = string_arg(TOOL, args, "action_type")?;
        let segment_name = string_arg(TOOL, args, "segment_type")?;

        let cache_key = (action_name.to_string(), segment_name.to_string());
        if let Some(cached) = self.cache.lock().get(&cache_key) {
            return Ok(cached.clone());
        }

        let action: ActionType = serde_json::from_value(Value::String(action_name.to_string()))
            .map_err(|_| ToolError::InvalidArgument {
                tool: TOOL,
                argument: "action_type",
                message: format!("'{action_name}' is not a recognized action"),
            })?;
        let segment: SegmentType =
            serde_json::from_value(Value::String(segment_name.to_string())).map_err(|_| {
                ToolError::InvalidArgument {
                    tool: TOOL,
                    argument: "segment_type",
                    message: format!("'{segment_name}' is not a recognized segment type"),
                }
            })?;

        let parameters = self.generate(action, segment);
        self.cache.lock().insert(cache_key, parameters.clone());
        Ok(parameters)
    }
}

// ---------------------------------------------------------------------------
// JsonValidationTool
// ---------------------------------------------------------------------------

/// Validates a meditation session JSON document against the session schema
/// and the fixed action vocabulary.
#[derive(Debug, Default)]
pub struct JsonValidationTool;

impl BaseTool for JsonValidationTool {
    fn name(&self) -> &str {
        "JSON Schema Validator"
    }

    fn description(&self) -> &str {
        "Validates meditation session JSON against the required schema"
    }

    fn args_schema(&self) -> Value {
        json!({
            "meditation_json": {"type": "string", "description": "JSON document to validate"},
        })
    }

    fn run(&self, args: &HashMap<String, Value>) -> Result<Value, ToolError> {
        const TOOL: &str = "json_validation";
        let raw = string_arg(TOOL, args, "meditation_json")?;

        let document = match serde_json::from_str(raw) {
            Ok(document) => document,
            Err(e) => {
                return Ok(json!({"valid": false, "errors": [format!("Invalid JSON: {e}")]}))
            }
        };

        match validate_session(&document) {
            Ok(()) => Ok(json!({"valid": true, "errors": []})),
            Err(e) => Ok(json!({"valid": false, "errors": [e.to_string()]})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> HashMap<String, Value> {
        value.as_object().unwrap().clone().into_iter().collect()
    }

    #[test]
    fn test_timing_tool_accumulates_segments() {
        let tool = MeditationTimingTool;
        let result = tool
            .run(&args(json!({
                "total_duration": 2,
                "segments": [
                    {"name": "Opening", "duration": 30},
                    {"name": "Closing", "duration": 90},
                ],
            })))
            .unwrap();
        assert_eq!(result["total_duration"], 120.0);
        assert_eq!(result["segments"][1]["start_time"], 30.0);
        assert_eq!(result["segments"][1]["end_time"], 120.0);
    }

    #[test]
    fn test_breathing_tool_fits_cycles() {
        let tool = BreathingPatternTool;
        let result = tool
            .run(&args(json!({"pattern_type": "box", "duration": 64})))
            .unwrap();
        assert_eq!(result["cycles"], 4);
        assert_eq!(result["total_duration"], 64.0);
    }

    #[test]
    fn test_breathing_tool_unknown_pattern_falls_back() {
        let tool = BreathingPatternTool;
        let result = tool
            .run(&args(json!({"pattern_type": "ujjayi", "duration": 24})))
            .unwrap();
        assert_eq!(result["pattern"]["inhale"], 4.0);
        assert_eq!(result["cycles"], 2);
    }

    #[test]
    fn test_content_tool_keys_on_difficulty() {
        let tool = MeditationContentTool;
        let advanced = tool
            .run(&args(json!({"theme": "clarity", "difficulty": "advanced"})))
            .unwrap();
        assert!(advanced["opening"]
            .as_str()
            .unwrap()
            .contains("intention"));
        assert_eq!(advanced["theme"], "clarity");
    }

    #[test]
    fn test_param_generator_caches() {
        let tool = ActionParameterGeneratorTool::new();
        let first = tool
            .run(&args(json!({"action_type": "speak", "segment_type": "opening"})))
            .unwrap();
        let second = tool
            .run(&args(json!({"action_type": "speak", "segment_type": "opening"})))
            .unwrap();
        assert_eq!(first, second);
        assert!(first["text"].as_str().unwrap().contains("Welcome"));
    }

    #[test]
    fn test_param_generator_rejects_unknown_action() {
        let tool = ActionParameterGeneratorTool::new();
        let err = tool
            .run(&args(json!({"action_type": "hum", "segment_type": "opening"})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }

    #[test]
    fn test_json_validation_tool_reports_errors() {
        let tool = JsonValidationTool;
        let result = tool
            .run(&args(json!({"meditation_json": "not json"})))
            .unwrap();
        assert_eq!(result["valid"], false);
    }
}
