//! Progress events emitted while a crew works through the pipeline.
//!
//! Events flow to an optional step callback on the crew; the HTTP layer
//! forwards them into per-job channels for the SSE status stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::project;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Design,
    Content,
    Timing,
    Formatting,
}

impl Stage {
    /// The configured agent responsible for this stage.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Design => project::MEDITATION_DESIGNER,
            Self::Content => project::CONTENT_CREATOR,
            Self::Timing => project::TIMING_SPECIALIST,
            Self::Formatting => project::SESSION_FORMATTER,
        }
    }

    /// The configured task executed in this stage.
    pub fn task_name(&self) -> &'static str {
        match self {
            Self::Design => project::MEDITATION_DESIGN_TASK,
            Self::Content => project::CONTENT_CREATION_TASK,
            Self::Timing => project::TIMING_ORCHESTRATION_TASK,
            Self::Formatting => project::SESSION_FORMATTING_TASK,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Design => "design",
            Self::Content => "content",
            Self::Timing => "timing",
            Self::Formatting => "formatting",
        };
        f.write_str(name)
    }
}

/// One progress event during a generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    StageStarted {
        stage: Stage,
        agent: String,
        timestamp: DateTime<Utc>,
    },
    StageCompleted {
        stage: Stage,
        agent: String,
        timestamp: DateTime<Utc>,
    },
    ValidationRejected {
        stage: Stage,
        attempt: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },
    PipelineCompleted {
        timestamp: DateTime<Utc>,
    },
    PipelineFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl GenerationEvent {
    pub fn stage_started(stage: Stage) -> Self {
        Self::StageStarted {
            stage,
            agent: stage.agent_name().to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn stage_completed(stage: Stage) -> Self {
        Self::StageCompleted {
            stage,
            agent: stage.agent_name().to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn validation_rejected(stage: Stage, attempt: u32, error: impl fmt::Display) -> Self {
        Self::ValidationRejected {
            stage,
            attempt,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn pipeline_completed() -> Self {
        Self::PipelineCompleted {
            timestamp: Utc::now(),
        }
    }

    pub fn pipeline_failed(error: impl fmt::Display) -> Self {
        Self::PipelineFailed {
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Callback invoked for every emitted event.
pub type StepCallback = Box<dyn Fn(&GenerationEvent) + Send + Sync>;
