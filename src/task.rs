//! A single pipeline task: a prompt template bound to an agent, plus the
//! record of its execution.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::project::TaskConfig;
use crate::utilities::string_utils::interpolate_only;

/// The result of an executed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Description of the task as executed (post-interpolation).
    pub description: String,
    /// Name of the task.
    pub name: String,
    /// Summary auto-generated from the description.
    pub summary: String,
    /// Raw model or stage output.
    pub raw: String,
    /// Parsed structured output, when the stage produced one.
    pub json_value: Option<Value>,
    /// Agent that executed the task.
    pub agent: String,
}

impl TaskOutput {
    pub fn new(description: String, name: String, agent: String, raw: String) -> Self {
        let summary = Self::generate_summary(&description);
        Self {
            description,
            name,
            summary,
            raw,
            json_value: None,
            agent,
        }
    }

    pub fn with_json(mut self, value: Value) -> Self {
        self.json_value = Some(value);
        self
    }

    /// First 10 words of the description plus an ellipsis.
    fn generate_summary(description: &str) -> String {
        let excerpt: String = description
            .split_whitespace()
            .take(10)
            .collect::<Vec<&str>>()
            .join(" ");
        format!("{excerpt}...")
    }
}

/// A task to be executed by one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task instance.
    pub id: Uuid,
    /// Configured task name (e.g. `meditation_design_task`).
    pub name: String,
    /// Descriptive text detailing the task's purpose, post-interpolation.
    pub description: String,
    /// Clear definition of the expected outcome, post-interpolation.
    pub expected_output: String,
    /// Name of the agent responsible for execution.
    pub agent: String,
    /// Output, once executed.
    pub output: Option<TaskOutput>,
    /// Start time of the task execution.
    pub start_time: Option<DateTime<Utc>>,
    /// End time of the task execution.
    pub end_time: Option<DateTime<Utc>>,

    #[serde(skip)]
    original_description: Option<String>,
    #[serde(skip)]
    original_expected_output: Option<String>,
}

impl Task {
    /// Create a task from its YAML configuration.
    pub fn from_config(name: &str, config: &TaskConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: config.description.trim().to_string(),
            expected_output: config.expected_output.trim().to_string(),
            agent: config.agent.clone(),
            output: None,
            start_time: None,
            end_time: None,
            original_description: None,
            original_expected_output: None,
        }
    }

    /// Interpolate `{placeholder}` inputs into the description and expected
    /// output, keeping the originals for re-interpolation.
    pub fn interpolate_inputs(&mut self, inputs: &HashMap<String, String>) -> Result<(), String> {
        if self.original_description.is_none() {
            self.original_description = Some(self.description.clone());
        }
        if self.original_expected_output.is_none() {
            self.original_expected_output = Some(self.expected_output.clone());
        }

        if let Some(ref original) = self.original_description {
            self.description = interpolate_only(original, inputs)?;
        }
        if let Some(ref original) = self.original_expected_output {
            self.expected_output = interpolate_only(original, inputs)?;
        }
        Ok(())
    }

    /// Generate the task prompt.
    pub fn prompt(&self) -> String {
        format!(
            "{}\nExpected Output: {}",
            self.description, self.expected_output
        )
    }

    /// Compute the key property (MD5 hash of description|expected_output),
    /// stable across interpolation.
    pub fn key(&self) -> String {
        let description = self
            .original_description
            .as_deref()
            .unwrap_or(&self.description);
        let expected = self
            .original_expected_output
            .as_deref()
            .unwrap_or(&self.expected_output);

        let mut hasher = Md5::new();
        hasher.update(format!("{description}|{expected}").as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn mark_started(&mut self) {
        self.start_time = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, output: TaskOutput) {
        self.output = Some(output);
        self.end_time = Some(Utc::now());
    }

    /// Execution duration in seconds, once both timestamps are set.
    pub fn execution_duration(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TaskConfig {
        TaskConfig {
            description: "Design a {duration}-minute session on {theme}.".into(),
            expected_output: "A JSON object.".into(),
            agent: "meditation_designer".into(),
        }
    }

    fn inputs() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("duration".to_string(), "10".to_string());
        map.insert("theme".to_string(), "clarity".to_string());
        map
    }

    #[test]
    fn test_interpolation_replaces_placeholders() {
        let mut task = Task::from_config("meditation_design_task", &config());
        task.interpolate_inputs(&inputs()).unwrap();
        assert_eq!(task.description, "Design a 10-minute session on clarity.");
        assert!(task.prompt().contains("Expected Output: A JSON object."));
    }

    #[test]
    fn test_key_stable_across_interpolation() {
        let mut task = Task::from_config("meditation_design_task", &config());
        let before = task.key();
        task.interpolate_inputs(&inputs()).unwrap();
        assert_eq!(task.key(), before);
    }

    #[test]
    fn test_reinterpolation_uses_original_template() {
        let mut task = Task::from_config("meditation_design_task", &config());
        task.interpolate_inputs(&inputs()).unwrap();
        let mut second = inputs();
        second.insert("theme".to_string(), "rest".to_string());
        task.interpolate_inputs(&second).unwrap();
        assert_eq!(task.description, "Design a 10-minute session on rest.");
    }

    #[test]
    fn test_output_summary() {
        let output = TaskOutput::new(
            "Design the structure of a ten minute meditation session on clarity today"
                .into(),
            "meditation_design_task".into(),
            "meditation_designer".into(),
            "{}".into(),
        );
        assert!(output.summary.ends_with("..."));
        assert_eq!(output.summary.split_whitespace().count(), 10);
    }
}
