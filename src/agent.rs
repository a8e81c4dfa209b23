//! An agent: a configured role bound to a language model and a set of
//! deterministic tools.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::llm::{BaseLLM, ChatMessage, LlmError};
use crate::project::AgentConfig;
use crate::tools::BaseTool;
use crate::utilities::string_utils::interpolate_only;

/// A pipeline agent.
///
/// Role, goal and backstory come from `agents.yaml` and may carry request
/// placeholders; [`Agent::interpolate_inputs`] resolves them before the first
/// call.
#[derive(Debug)]
pub struct Agent {
    pub id: Uuid,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub verbose: bool,
    pub tools: Vec<Arc<dyn BaseTool>>,
    llm: Arc<dyn BaseLLM>,
}

impl Agent {
    /// Create an agent from its YAML configuration.
    pub fn from_config(config: &AgentConfig, llm: Arc<dyn BaseLLM>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: config.role.trim().to_string(),
            goal: config.goal.trim().to_string(),
            backstory: config.backstory.trim().to_string(),
            verbose: false,
            tools: Vec::new(),
            llm,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn BaseTool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Interpolate request inputs into the role, goal and backstory.
    pub fn interpolate_inputs(&mut self, inputs: &HashMap<String, String>) -> Result<(), String> {
        self.role = interpolate_only(&self.role, inputs)?;
        self.goal = interpolate_only(&self.goal, inputs)?;
        self.backstory = interpolate_only(&self.backstory, inputs)?;
        Ok(())
    }

    /// The role-playing system prompt for this agent.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}.\n{}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if !self.tools.is_empty() {
            prompt.push_str(
                "\nThe results of these deterministic tools are provided to you as context:",
            );
            for tool in &self.tools {
                prompt.push_str(&format!("\n- {}: {}", tool.name(), tool.description()));
            }
        }
        prompt
    }

    /// Run one model call with this agent's persona.
    pub async fn execute(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if self.verbose {
            log::debug!("[Agent:{}] calling {}", self.role, self.llm.model());
        }
        let reply = self.llm.call(messages).await?;
        if self.verbose {
            log::debug!("[Agent:{}] received {} bytes", self.role, reply.len());
        }
        Ok(reply)
    }
}
