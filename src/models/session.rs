//! The final artifact: one self-contained JSON document handed to the
//! external executor.
//!
//! Wire shape (camelCase timing fields, lowercase agent names):
//!
//! ```json
//! {
//!   "session": {
//!     "title": "...", "duration": 600, "theme": "...", "difficulty": "beginner",
//!     "segments": [
//!       { "id": "opening", "name": "Opening", "type": "opening",
//!         "startTime": 0.0, "endTime": 30.0, "duration": 30.0,
//!         "actions": [
//!           { "agent": "voice", "action": "speak",
//!             "timing": { "start": 0.0, "duration": 8.0 },
//!             "parameters": { "text": "Welcome." } }
//!         ] }
//!     ]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::structure::{Difficulty, SegmentType};
use super::timing::{ActionType, AgentKind};

/// Recognized kinds of timer silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilenceKind {
    Reflection,
    Rest,
    Transition,
}

impl SilenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reflection => "reflection",
            Self::Rest => "rest",
            Self::Transition => "transition",
        }
    }
}

impl FromStr for SilenceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reflection" => Ok(Self::Reflection),
            "rest" => Ok(Self::Rest),
            "transition" => Ok(Self::Transition),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SilenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When an action plays, relative to session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionTiming {
    pub start: f64,
    pub duration: f64,
}

/// One executable action addressed to an executor agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub agent: AgentKind,
    pub action: ActionType,
    pub timing: ActionTiming,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Action {
    /// Fetch a parameter as a non-empty string, if present.
    pub fn string_parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Fetch a parameter as a finite number, if present.
    pub fn number_parameter(&self, key: &str) -> Option<f64> {
        self.parameters
            .get(key)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
    }
}

/// One segment of the final session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub actions: Vec<Action>,
}

/// Session metadata plus the ordered segments with their action lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeditationSession {
    pub title: String,
    /// Total duration in whole seconds (`duration_minutes * 60`).
    pub duration: u32,
    pub theme: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<String>,
    pub segments: Vec<Segment>,
}

/// The boundary artifact: the session wrapped under a `session` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub session: MeditationSession,
}

impl SessionDocument {
    pub fn new(session: MeditationSession) -> Self {
        Self { session }
    }
}
