//! # med-crew
//!
//! A multi-agent pipeline that turns a request (theme, duration, difficulty)
//! into a structured JSON meditation-session script for an external playback
//! frontend.
//!
//! Four stages run in strict sequence — structure design, content authoring,
//! timing orchestration, session formatting — each gated by a deterministic
//! validator. The first two stages call a language model behind the narrow
//! [`llm::BaseLLM`] interface; timing and formatting are deterministic, so
//! the final document's invariants (contiguous segments, exact total
//! duration, complete action parameters) hold by construction.

pub mod agent;
pub mod crew;
pub mod events;
pub mod llm;
pub mod models;
pub mod process;
pub mod project;
pub mod server;
pub mod task;
pub mod timing;
pub mod tools;
pub mod utilities;
pub mod validation;

pub use agent::Agent;
pub use crew::{CrewOutput, GenerationError, GenerationRequest, MeditationCrew};
pub use llm::{BaseLLM, OpenAICompletion};
pub use models::{
    MeditationContent, MeditationSession, MeditationStructure, MeditationTiming, SessionDocument,
};
pub use process::Process;
pub use task::{Task, TaskOutput};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
