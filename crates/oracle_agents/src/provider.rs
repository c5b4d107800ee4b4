//! Reasoning provider abstraction and an OpenAI-compatible HTTP client.
//!
//! Stages never talk to a vendor SDK directly: they send a
//! [`ReasoningRequest`] to an injected [`ReasoningProvider`] and get raw text
//! back. Credentials are handed to the provider at construction time.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

/// One prompt sent to a reasoning model.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    /// System / persona instructions.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature override; `None` uses the provider's setting.
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response.
    pub json_response: bool,
}

impl ReasoningRequest {
    /// Plain-text request.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: None,
            json_response: false,
        }
    }

    /// Request a JSON object response.
    pub fn expect_json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// External reasoning capability.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Send `request` and return the model's text answer.
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ProviderError>;
}

/// Connection settings for [`HttpReasoningProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Name used in logs.
    pub name: String,
    /// API base URL, e.g. `https://api.deepseek.com/v1`.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token; `None` for unauthenticated local gateways.
    pub api_key: Option<String>,
    /// Default sampling temperature.
    pub temperature: f32,
    /// Transport-level timeout for one HTTP request.
    pub request_timeout: Duration,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpReasoningProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Maximum number of body characters kept in a status error.
const ERROR_BODY_LIMIT: usize = 512;

impl HttpReasoningProvider {
    /// Create a provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Body for `request`; its temperature falls back to the configured one.
    fn chat_request<'a>(&'a self, request: &'a ReasoningRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature.unwrap_or(self.config.temperature),
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    fn map_transport(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.request_timeout)
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ProviderError> {
        let body = self.chat_request(request);
        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(provider = %self.config.name, model = %self.config.model, "sending reasoning request");
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("response has no message content".to_string()))
    }
}
