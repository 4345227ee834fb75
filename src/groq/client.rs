//! Chat completion via the Groq API (OpenAI-compatible format).

use crate::config::PersonaLensConfig;
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Failure modes of a completion request.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion API key is not configured")]
    MissingCredentials,
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("completion API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("completion content is not valid JSON: {0}")]
    Parse(String),
}

/// A hosted chat-completion service.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Send the transcript once and return the assistant's text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<String, CompletionError>;

    /// Request JSON mode and parse the content.
    async fn complete_json(
        &self,
        messages: &[ChatMessage],
    ) -> Result<serde_json::Value, CompletionError> {
        let content = self.complete(messages, true).await?;
        serde_json::from_str(&content).map_err(|e| CompletionError::Parse(e.to_string()))
    }
}

/// Groq client. Constructed once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct GroqClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl GroqClient {
    /// Create a new client.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            http: reqwest::Client::new(),
        }
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &PersonaLensConfig) -> Self {
        Self::new(&config.groq_api_url, &config.groq_api_key, &config.chat_model)
            .with_sampling(config.max_tokens, config.temperature)
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Completion for GroqClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<String, CompletionError> {
        if self.api_key.is_empty() {
            warn!("GROQ_API_KEY not configured; skipping completion request");
            return Err(CompletionError::MissingCredentials);
        }

        let url = format!("{}/openai/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| MessagePayload {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
        };

        debug!(
            "Completion request to model {} ({} messages, json_mode={})",
            self.model,
            messages.len(),
            json_mode
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::MalformedResponse("no message content".into()))
    }
}
