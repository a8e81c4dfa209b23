//! Language-model abstraction for the two generative stages.
//!
//! Every model interaction goes through the narrow [`BaseLLM`] trait:
//! messages in, one text reply out. The deterministic validators gate each
//! reply immediately after the call, so providers stay oblivious to the
//! session domain.

pub mod openai;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use openai::OpenAICompletion;

/// A single message in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Errors from a language-model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not set: set the {var} environment variable")]
    MissingApiKey { var: &'static str },

    #[error("HTTP error calling the model API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model reply had no content")]
    EmptyResponse,

    #[error("failed to parse model API response: {message}")]
    MalformedResponse { message: String },
}

/// Abstract base trait for model providers.
///
/// Implementations must be shareable across tasks; the pipeline clones an
/// `Arc<dyn BaseLLM>` into each stage.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// The model identifier (e.g. `gpt-4o-mini`).
    fn model(&self) -> &str;

    /// Sampling temperature, if the provider supports one.
    fn temperature(&self) -> Option<f64> {
        None
    }

    /// Send a conversation and return the reply text.
    async fn call(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let message = ChatMessage::system("You are a meditation designer.");
        assert_eq!(message.role, "system");
        assert_eq!(ChatMessage::user("go").role, "user");
        assert_eq!(ChatMessage::assistant("ok").role, "assistant");
    }
}
