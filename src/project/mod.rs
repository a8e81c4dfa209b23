//! Crew configuration: the YAML agent and task definitions.
//!
//! The four agent roles and four task templates are process-wide
//! configuration, loaded once before any generation request and never
//! mutated afterwards. Templates carry `{theme}`, `{duration}` and
//! `{difficulty_level}` placeholders interpolated per request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Agent name for the structure-design stage.
pub const MEDITATION_DESIGNER: &str = "meditation_designer";
/// Agent name for the content-authoring stage.
pub const CONTENT_CREATOR: &str = "content_creator";
/// Agent name for the timing stage.
pub const TIMING_SPECIALIST: &str = "timing_specialist";
/// Agent name for the formatting stage.
pub const SESSION_FORMATTER: &str = "session_formatter";

/// Task name for the structure-design stage.
pub const MEDITATION_DESIGN_TASK: &str = "meditation_design_task";
/// Task name for the content-authoring stage.
pub const CONTENT_CREATION_TASK: &str = "content_creation_task";
/// Task name for the timing stage.
pub const TIMING_ORCHESTRATION_TASK: &str = "timing_orchestration_task";
/// Task name for the formatting stage.
pub const SESSION_FORMATTING_TASK: &str = "session_formatting_task";

const REQUIRED_AGENTS: [&str; 4] = [
    MEDITATION_DESIGNER,
    CONTENT_CREATOR,
    TIMING_SPECIALIST,
    SESSION_FORMATTER,
];
const REQUIRED_TASKS: [&str; 4] = [
    MEDITATION_DESIGN_TASK,
    CONTENT_CREATION_TASK,
    TIMING_ORCHESTRATION_TASK,
    SESSION_FORMATTING_TASK,
];

/// Default agent definitions baked into the binary.
pub const DEFAULT_AGENTS_YAML: &str = include_str!("../../config/agents.yaml");
/// Default task definitions baked into the binary.
pub const DEFAULT_TASKS_YAML: &str = include_str!("../../config/tasks.yaml");

/// One agent definition from `agents.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

/// One task definition from `tasks.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub description: String,
    pub expected_output: String,
    pub agent: String,
}

/// Errors raised while loading or resolving crew configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no agent named '{name}' in agents config")]
    MissingAgent { name: String },

    #[error("no task named '{name}' in tasks config")]
    MissingTask { name: String },

    #[error("task '{task}' references unknown agent '{agent}'")]
    UnknownTaskAgent { task: String, agent: String },
}

/// The loaded, immutable crew configuration.
#[derive(Debug, Clone)]
pub struct CrewConfig {
    agents: HashMap<String, AgentConfig>,
    tasks: HashMap<String, TaskConfig>,
}

impl CrewConfig {
    /// Parse agent and task definitions from YAML strings.
    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self, ConfigError> {
        let agents: HashMap<String, AgentConfig> = serde_yaml::from_str(agents_yaml)?;
        let tasks: HashMap<String, TaskConfig> = serde_yaml::from_str(tasks_yaml)?;
        let config = Self { agents, tasks };
        config.check()?;
        Ok(config)
    }

    /// Load agent and task definitions from YAML files.
    pub fn from_files(
        agents_path: impl AsRef<Path>,
        tasks_path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let agents_yaml = std::fs::read_to_string(agents_path)?;
        let tasks_yaml = std::fs::read_to_string(tasks_path)?;
        Self::from_yaml(&agents_yaml, &tasks_yaml)
    }

    /// The configuration baked into the binary, parsed once.
    pub fn embedded() -> &'static CrewConfig {
        static EMBEDDED: OnceLock<CrewConfig> = OnceLock::new();
        EMBEDDED.get_or_init(|| {
            CrewConfig::from_yaml(DEFAULT_AGENTS_YAML, DEFAULT_TASKS_YAML)
                .expect("embedded crew configuration must parse")
        })
    }

    fn check(&self) -> Result<(), ConfigError> {
        for name in REQUIRED_AGENTS {
            if !self.agents.contains_key(name) {
                return Err(ConfigError::MissingAgent { name: name.into() });
            }
        }
        for name in REQUIRED_TASKS {
            let task = self
                .tasks
                .get(name)
                .ok_or_else(|| ConfigError::MissingTask { name: name.into() })?;
            if !self.agents.contains_key(&task.agent) {
                return Err(ConfigError::UnknownTaskAgent {
                    task: name.into(),
                    agent: task.agent.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn agent(&self, name: &str) -> Result<&AgentConfig, ConfigError> {
        self.agents
            .get(name)
            .ok_or_else(|| ConfigError::MissingAgent { name: name.into() })
    }

    pub fn task(&self, name: &str) -> Result<&TaskConfig, ConfigError> {
        self.tasks
            .get(name)
            .ok_or_else(|| ConfigError::MissingTask { name: name.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_config_parses() {
        let config = CrewConfig::embedded();
        let designer = config.agent(MEDITATION_DESIGNER).unwrap();
        assert!(designer.role.contains("Designer"));
        let task = config.task(MEDITATION_DESIGN_TASK).unwrap();
        assert_eq!(task.agent, MEDITATION_DESIGNER);
        assert!(task.description.contains("{duration}"));
    }

    #[test]
    fn test_missing_agent_rejected() {
        let agents = "content_creator:\n  role: Writer\n  goal: Write\n  backstory: Writes\n";
        let err = CrewConfig::from_yaml(agents, DEFAULT_TASKS_YAML).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAgent { .. }));
    }

    #[test]
    fn test_task_referencing_unknown_agent_rejected() {
        let tasks = DEFAULT_TASKS_YAML.replace("agent: meditation_designer", "agent: ghost");
        let err = CrewConfig::from_yaml(DEFAULT_AGENTS_YAML, &tasks).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTaskAgent { .. }));
    }

    #[test]
    fn test_from_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let agents_path = dir.path().join("agents.yaml");
        let tasks_path = dir.path().join("tasks.yaml");
        let mut agents = std::fs::File::create(&agents_path).unwrap();
        agents.write_all(DEFAULT_AGENTS_YAML.as_bytes()).unwrap();
        let mut tasks = std::fs::File::create(&tasks_path).unwrap();
        tasks.write_all(DEFAULT_TASKS_YAML.as_bytes()).unwrap();

        let config = CrewConfig::from_files(&agents_path, &tasks_path).unwrap();
        assert!(config.agent(SESSION_FORMATTER).is_ok());
    }
}
