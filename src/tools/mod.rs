//! Deterministic tools available to the generation agents.

pub mod base_tool;
pub mod meditation_tools;

pub use base_tool::{BaseTool, ToolError};
pub use meditation_tools::{
    ActionParameterGeneratorTool, BreathingPatternTool, JsonValidationTool,
    MeditationContentTool, MeditationTimingTool,
};
