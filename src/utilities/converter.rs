//! Conversion of free-form model replies into structured JSON.
//!
//! Language models asked for JSON routinely wrap it in markdown fences or
//! prose. The converter strips that decoration and parses whatever object is
//! left; anything unparseable is a conversion failure the caller treats like
//! any other validation rejection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Error raised when a reply cannot be converted to a JSON object.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConverterError {
    pub message: String,
}

impl ConverterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Extract the JSON object embedded in a model reply.
///
/// Tries, in order: the whole reply, the first fenced code block, and the
/// outermost `{...}` span.
pub fn extract_json(raw: &str) -> Result<Value, ConverterError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(captures) = CODE_FENCE.captures(trimmed) {
        let fenced = captures[1].trim();
        if let Ok(value) = serde_json::from_str::<Value>(fenced) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    let preview: String = trimmed.chars().take(200).collect();
    Err(ConverterError::new(format!(
        "No valid JSON found in reply: {preview}"
    )))
}
