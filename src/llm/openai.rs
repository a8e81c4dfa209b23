//! OpenAI-compatible chat-completion provider.
//!
//! Talks to any endpoint implementing the `/chat/completions` shape. Replies
//! are requested in JSON mode since every pipeline stage expects a JSON
//! object back. Transient failures (429, 5xx, transport errors) are retried
//! with exponential backoff; client errors are surfaced immediately.

use async_trait::async_trait;
use serde_json::Value;

use super::{BaseLLM, ChatMessage, LlmError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// OpenAI-compatible completion implementation.
#[derive(Debug, Clone)]
pub struct OpenAICompletion {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAICompletion {
    /// Create a provider for `model`, reading the API key from the
    /// environment if not supplied.
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var(API_KEY_VAR).ok());
        Self {
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            temperature: None,
            max_retries: 2,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build a provider entirely from environment variables
    /// (`MEDCREW_MODEL`, `OPENAI_BASE_URL`, `OPENAI_API_KEY`).
    pub fn from_env() -> Self {
        let model = std::env::var("MEDCREW_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let mut provider = Self::new(model, None);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            provider.base_url = base_url;
        }
        provider
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn build_request_body(&self, messages: &[ChatMessage]) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "response_format": {"type": "json_object"},
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }

    fn parse_reply(response: &Value) -> Result<String, LlmError> {
        let content = response
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or(LlmError::EmptyResponse)?;
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    async fn call(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(LlmError::MissingApiKey { var: API_KEY_VAR })?;

        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_request_body(messages);

        log::debug!(
            "OpenAICompletion.call: model={}, messages={}",
            self.model,
            messages.len()
        );

        let mut last_error: Option<LlmError> = None;
        let mut retry_delay = std::time::Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("model API retry attempt {attempt} after {retry_delay:?}");
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match self
                .client
                .post(&endpoint)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    body,
                });
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            if status.is_client_error() {
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let parsed: Value =
                serde_json::from_str(&text).map_err(|e| LlmError::MalformedResponse {
                    message: format!(
                        "{e} - body: {}",
                        text.chars().take(500).collect::<String>()
                    ),
                })?;
            return Self::parse_reply(&parsed);
        }

        Err(last_error.unwrap_or(LlmError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let provider =
            OpenAICompletion::new("gpt-4o-mini", Some("sk-test".into())).with_temperature(0.7);
        let body = provider.build_request_body(&[ChatMessage::user("hello")]);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_reply_extracts_content() {
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]
        });
        assert_eq!(
            OpenAICompletion::parse_reply(&response).unwrap(),
            "{\"ok\": true}"
        );
    }

    #[test]
    fn test_parse_reply_rejects_empty() {
        let response = serde_json::json!({"choices": []});
        assert!(matches!(
            OpenAICompletion::parse_reply(&response),
            Err(LlmError::EmptyResponse)
        ));
    }
}
