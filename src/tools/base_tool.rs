//! Base tool abstraction.
//!
//! Tools are deterministic helpers exposed to the generation agents: their
//! names and descriptions are listed in agent prompts, and the crew invokes
//! them directly to build stage context. Arguments arrive as a JSON map and
//! results leave as a JSON value, so outputs can be embedded in prompts or
//! returned to callers unchanged.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Errors raised by tool execution.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool '{tool}' is missing required argument '{argument}'")]
    MissingArgument {
        tool: &'static str,
        argument: &'static str,
    },

    #[error("tool '{tool}' argument '{argument}' is invalid: {message}")]
    InvalidArgument {
        tool: &'static str,
        argument: &'static str,
        message: String,
    },
}

/// Abstract base trait for all crew tools.
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the arguments that the tool accepts.
    fn args_schema(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// Execute the tool with the given arguments.
    fn run(&self, args: &HashMap<String, Value>) -> Result<Value, ToolError>;
}

/// Fetch a required string argument.
pub(crate) fn string_arg<'a>(
    tool: &'static str,
    args: &'a HashMap<String, Value>,
    name: &'static str,
) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or(ToolError::MissingArgument {
            tool,
            argument: name,
        })
}

/// Fetch a required finite number argument.
pub(crate) fn number_arg(
    tool: &'static str,
    args: &HashMap<String, Value>,
    name: &'static str,
) -> Result<f64, ToolError> {
    let value = args
        .get(name)
        .and_then(Value::as_f64)
        .ok_or(ToolError::MissingArgument {
            tool,
            argument: name,
        })?;
    if !value.is_finite() {
        return Err(ToolError::InvalidArgument {
            tool,
            argument: name,
            message: "must be a finite number".into(),
        });
    }
    Ok(value)
}
