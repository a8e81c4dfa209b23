//! The meditation crew: four stages run in strict sequence, each gated by a
//! deterministic validator.
//!
//! Structure design and content authoring are model calls; a stage whose
//! output fails its validator is re-invoked with the rejection appended to
//! the conversation, up to the guardrail retry limit. Timing orchestration
//! and session formatting are deterministic, so their contracts are satisfied
//! by construction and the validators run as a final safety gate.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::agent::Agent;
use crate::events::{GenerationEvent, Stage, StepCallback};
use crate::llm::{BaseLLM, ChatMessage, LlmError};
use crate::models::{
    Difficulty, MeditationContent, MeditationStructure, MeditationTiming, SessionDocument,
};
use crate::process::Process;
use crate::project::{ConfigError, CrewConfig};
use crate::task::{Task, TaskOutput};
use crate::timing::breathing::NATURAL_PATTERN;
use crate::timing::calculate_timing;
use crate::tools::{
    ActionParameterGeneratorTool, BaseTool, BreathingPatternTool, MeditationContentTool,
    MeditationTimingTool, ToolError,
};
use crate::utilities::converter::extract_json;
use crate::validation::vocabulary::{assemble_session, SessionError};
use crate::validation::{
    validate_content, validate_session, validate_structure, validate_timing, ContentError,
    StructureError, TimingError, VocabularyError,
};

/// Default number of regeneration attempts after a validation rejection.
const DEFAULT_GUARDRAIL_RETRIES: u32 = 3;

/// Convert a `json!` object literal into tool arguments.
fn tool_args(value: serde_json::Value) -> HashMap<String, serde_json::Value> {
    value
        .as_object()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .collect()
}

/// One session-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub theme: String,
    /// Target duration in minutes.
    pub duration: u32,
    pub difficulty: Difficulty,
}

impl GenerationRequest {
    pub fn new(theme: impl Into<String>, duration: u32, difficulty: Difficulty) -> Self {
        Self {
            theme: theme.into(),
            duration,
            difficulty,
        }
    }

    /// Template inputs derived from the request.
    pub fn inputs(&self) -> HashMap<String, String> {
        let mut inputs = HashMap::new();
        inputs.insert("theme".to_string(), self.theme.clone());
        inputs.insert("duration".to_string(), self.duration.to_string());
        inputs.insert(
            "difficulty_level".to_string(),
            self.difficulty.as_str().to_string(),
        );
        inputs
    }
}

/// Anything that can end a generation run.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("template interpolation failed: {0}")]
    Interpolation(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("serializing stage output failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{stage} stage returned malformed output: {message}")]
    MalformedOutput { stage: Stage, message: String },

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Everything a finished run produced, stage by stage.
#[derive(Debug)]
pub struct CrewOutput {
    pub structure: MeditationStructure,
    pub content: MeditationContent,
    pub timing: MeditationTiming,
    /// The boundary artifact handed to the external executor.
    pub session: SessionDocument,
    pub tasks_output: Vec<TaskOutput>,
}

/// The four-stage meditation generation crew.
pub struct MeditationCrew {
    pub id: Uuid,
    pub name: String,
    pub process: Process,
    pub verbose: bool,
    pub guardrail_max_retries: u32,
    config: CrewConfig,
    llm: Arc<dyn BaseLLM>,
    step_callback: Option<StepCallback>,
}

impl std::fmt::Debug for MeditationCrew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeditationCrew")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("process", &self.process)
            .field("verbose", &self.verbose)
            .field("guardrail_max_retries", &self.guardrail_max_retries)
            .finish_non_exhaustive()
    }
}

impl MeditationCrew {
    /// Create a crew over the given configuration and model.
    pub fn new(config: CrewConfig, llm: Arc<dyn BaseLLM>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "med-crew".to_string(),
            process: Process::Sequential,
            verbose: false,
            guardrail_max_retries: DEFAULT_GUARDRAIL_RETRIES,
            config,
            llm,
            step_callback: None,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_guardrail_max_retries(mut self, retries: u32) -> Self {
        self.guardrail_max_retries = retries;
        self
    }

    /// Register a callback invoked for every progress event.
    pub fn with_step_callback(
        mut self,
        callback: impl Fn(&GenerationEvent) + Send + Sync + 'static,
    ) -> Self {
        self.step_callback = Some(Box::new(callback));
        self
    }

    fn emit(&self, event: GenerationEvent) {
        if self.verbose {
            log::info!("[Crew:{}] {:?}", self.name, event);
        }
        if let Some(ref callback) = self.step_callback {
            callback(&event);
        }
    }

    /// Run the full pipeline for one request.
    pub async fn kickoff(
        &self,
        request: &GenerationRequest,
    ) -> Result<CrewOutput, GenerationError> {
        let result = self.run_pipeline(request).await;
        match &result {
            Ok(_) => self.emit(GenerationEvent::pipeline_completed()),
            Err(e) => self.emit(GenerationEvent::pipeline_failed(e)),
        }
        result
    }

    async fn run_pipeline(
        &self,
        request: &GenerationRequest,
    ) -> Result<CrewOutput, GenerationError> {
        let inputs = request.inputs();
        let mut tasks_output = Vec::with_capacity(4);

        // Stage 1 — structure design.
        let requested_minutes = request.duration;
        let requested_difficulty = request.difficulty;
        let (structure, output) = self
            .run_llm_stage::<MeditationStructure, _>(
                Stage::Design,
                &inputs,
                None,
                vec![Arc::new(MeditationTimingTool)],
                |candidate| {
                    validate_structure(candidate)?;
                    if candidate.total_duration_minutes != requested_minutes {
                        return Err(StructureError::RequestDurationMismatch {
                            requested: requested_minutes,
                            produced: candidate.total_duration_minutes,
                        }
                        .into());
                    }
                    if candidate.difficulty != requested_difficulty {
                        return Err(StructureError::RequestDifficultyMismatch {
                            requested: requested_difficulty,
                            produced: candidate.difficulty,
                        }
                        .into());
                    }
                    Ok(())
                },
            )
            .await?;
        tasks_output.push(output);

        // Stage 2 — content authoring, with the structure and tool results
        // as context.
        let context = self.content_stage_context(&structure)?;
        let (content, output) = self
            .run_llm_stage::<MeditationContent, _>(
                Stage::Content,
                &inputs,
                Some(&context),
                vec![
                    Arc::new(MeditationContentTool),
                    Arc::new(BreathingPatternTool),
                    Arc::new(ActionParameterGeneratorTool::new()),
                ],
                |candidate| validate_content(&structure, candidate).map_err(Into::into),
            )
            .await?;
        tasks_output.push(output);

        // Stage 3 — deterministic timing orchestration.
        self.emit(GenerationEvent::stage_started(Stage::Timing));
        let mut timing_task = self.build_task(Stage::Timing, &inputs)?;
        timing_task.mark_started();
        let timing = calculate_timing(&structure, &content)?;
        validate_timing(&timing)?;
        let timing_value = serde_json::to_value(&timing)?;
        let output = TaskOutput::new(
            timing_task.description.clone(),
            timing_task.name.clone(),
            timing_task.agent.clone(),
            timing_value.to_string(),
        )
        .with_json(timing_value);
        timing_task.mark_completed(output.clone());
        tasks_output.push(output);
        self.emit(GenerationEvent::stage_completed(Stage::Timing));

        // Stage 4 — deterministic assembly under the vocabulary enforcer.
        self.emit(GenerationEvent::stage_started(Stage::Formatting));
        let mut formatting_task = self.build_task(Stage::Formatting, &inputs)?;
        formatting_task.mark_started();
        let session = assemble_session(&timing, &structure)?;
        // Idempotence gate: an assembled document re-validates cleanly.
        validate_session(&session)?;
        let session_value = serde_json::to_value(&session)?;
        let output = TaskOutput::new(
            formatting_task.description.clone(),
            formatting_task.name.clone(),
            formatting_task.agent.clone(),
            session_value.to_string(),
        )
        .with_json(session_value);
        formatting_task.mark_completed(output.clone());
        tasks_output.push(output);
        self.emit(GenerationEvent::stage_completed(Stage::Formatting));

        Ok(CrewOutput {
            structure,
            content,
            timing,
            session,
            tasks_output,
        })
    }

    fn build_agent(
        &self,
        stage: Stage,
        inputs: &HashMap<String, String>,
        tools: Vec<Arc<dyn BaseTool>>,
    ) -> Result<Agent, GenerationError> {
        let config = self.config.agent(stage.agent_name())?;
        let mut agent = Agent::from_config(config, Arc::clone(&self.llm))
            .with_tools(tools)
            .with_verbose(self.verbose);
        agent
            .interpolate_inputs(inputs)
            .map_err(GenerationError::Interpolation)?;
        Ok(agent)
    }

    fn build_task(
        &self,
        stage: Stage,
        inputs: &HashMap<String, String>,
    ) -> Result<Task, GenerationError> {
        let config = self.config.task(stage.task_name())?;
        let mut task = Task::from_config(stage.task_name(), config);
        task.interpolate_inputs(inputs)
            .map_err(GenerationError::Interpolation)?;
        Ok(task)
    }

    /// Run one model-backed stage through its validation gate.
    ///
    /// A rejected candidate is appended to the conversation together with the
    /// rejection, and the stage re-runs until it validates or the retry
    /// budget is spent; the last rejection is then surfaced unchanged.
    async fn run_llm_stage<T, F>(
        &self,
        stage: Stage,
        inputs: &HashMap<String, String>,
        context: Option<&str>,
        tools: Vec<Arc<dyn BaseTool>>,
        validate: F,
    ) -> Result<(T, TaskOutput), GenerationError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), GenerationError>,
    {
        self.emit(GenerationEvent::stage_started(stage));

        let agent = self.build_agent(stage, inputs, tools)?;
        let mut task = self.build_task(stage, inputs)?;
        task.mark_started();

        let mut user_prompt = task.prompt();
        if let Some(context) = context {
            user_prompt.push_str("\nThis is the context you're working with:\n");
            user_prompt.push_str(context);
        }

        let mut messages = vec![
            ChatMessage::system(agent.system_prompt()),
            ChatMessage::user(user_prompt),
        ];

        let mut last_error: Option<GenerationError> = None;
        for attempt in 1..=self.guardrail_max_retries + 1 {
            let raw = agent.execute(&messages).await?;

            let candidate = extract_json(&raw)
                .map_err(|e| GenerationError::MalformedOutput {
                    stage,
                    message: e.to_string(),
                })
                .and_then(|value| {
                    let parsed: T = serde_json::from_value(value.clone()).map_err(|e| {
                        GenerationError::MalformedOutput {
                            stage,
                            message: e.to_string(),
                        }
                    })?;
                    validate(&parsed)?;
                    Ok((parsed, value))
                });

            match candidate {
                Ok((parsed, value)) => {
                    let output = TaskOutput::new(
                        task.description.clone(),
                        task.name.clone(),
                        task.agent.clone(),
                        raw,
                    )
                    .with_json(value);
                    task.mark_completed(output.clone());
                    self.emit(GenerationEvent::stage_completed(stage));
                    return Ok((parsed, output));
                }
                Err(error) => {
                    self.emit(GenerationEvent::validation_rejected(stage, attempt, &error));
                    if attempt <= self.guardrail_max_retries {
                        messages.push(ChatMessage::assistant(raw));
                        messages.push(ChatMessage::user(format!(
                            "Your previous answer failed validation: {error}\n\
                             Return a corrected JSON object that fixes exactly this problem. \
                             Return the JSON only."
                        )));
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or(GenerationError::MalformedOutput {
            stage,
            message: "stage produced no output".to_string(),
        }))
    }

    /// Deterministic tool context injected into the content stage.
    fn content_stage_context(
        &self,
        structure: &MeditationStructure,
    ) -> Result<String, GenerationError> {
        let structure_json = serde_json::to_string_pretty(structure)?;

        let timing_tool = MeditationTimingTool;
        let layout = timing_tool.run(&tool_args(json!({
            "total_duration": structure.total_duration_minutes,
            "segments": structure
                .planned_segments
                .iter()
                .map(|plan| json!({"name": plan.name, "duration": plan.duration_seconds}))
                .collect::<Vec<_>>(),
        })))?;

        let pattern = structure.breathing_pattern.unwrap_or(NATURAL_PATTERN);
        let pattern_name = ["4-7-8", "box", "natural", "calm"]
            .into_iter()
            .find(|name| crate::timing::named_pattern(name) == Some(pattern))
            .unwrap_or("natural");
        let breathwork_window: f64 = structure
            .planned_segments
            .iter()
            .filter(|plan| plan.segment_type == crate::models::SegmentType::Breathwork)
            .map(|plan| plan.duration_seconds)
            .sum();
        let breathing_tool = BreathingPatternTool;
        let breathing = breathing_tool.run(&tool_args(json!({
            "pattern_type": pattern_name,
            "duration": if breathwork_window > 0.0 { breathwork_window } else { 60.0 },
        })))?;

        let content_tool = MeditationContentTool;
        let templates = content_tool.run(&tool_args(json!({
            "theme": structure.theme,
            "difficulty": structure.difficulty.as_str(),
        })))?;

        let parameter_tool = ActionParameterGeneratorTool::new();
        let mut defaults = serde_json::Map::new();
        for plan in &structure.planned_segments {
            let key = plan.segment_type.as_str();
            if !defaults.contains_key(key) {
                let speak = parameter_tool.run(&tool_args(
                    json!({"action_type": "speak", "segment_type": key}),
                ))?;
                defaults.insert(key.to_string(), speak);
            }
        }

        Ok(format!(
            "Session structure:\n{structure_json}\n\n\
             Timing plan:\n{layout}\n\n\
             Breathing pattern:\n{breathing}\n\n\
             Script style exemplars:\n{templates}\n\n\
             Default voice lines per segment type:\n{}",
            serde_json::Value::Object(defaults)
        ))
    }
}
