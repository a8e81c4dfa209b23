//! Data model for the four-stage meditation generation pipeline.
//!
//! Each stage produces exactly one of these objects, in strict sequence:
//! [`MeditationStructure`] → [`MeditationContent`] → [`MeditationTiming`] →
//! [`MeditationSession`]. None of them is mutated after production and none
//! is persisted by this crate.

pub mod content;
pub mod session;
pub mod structure;
pub mod timing;

pub use content::{BreathCue, BreathGuidance, BreathPhase, MeditationContent, ScriptSegment};
pub use session::{
    Action, ActionTiming, MeditationSession, Segment, SessionDocument, SilenceKind,
};
pub use structure::{
    BreathPattern, Difficulty, MeditationStructure, SegmentPlan, SegmentType,
};
pub use timing::{ActionType, AgentKind, MeditationTiming, TimedInstruction, TimedSegment};
