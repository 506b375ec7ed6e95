//! OpenAI-compatible Chat Completions client
//!
//! POSTs `{base_url}/chat/completions` and returns
//! `choices[0].message.content`. HTTP statuses are mapped onto [`LlmError`]
//! so callers can tell auth problems from rate limits from outages.

use super::{ChatMessage, CompletionClient, LlmError, preview};
use crate::config::LlmConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for a single model on an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_seconds: u64,
}

impl OpenAiClient {
    /// Build a client from the `[llm]` config section and an API key
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            api_key: api_key.into(),
            timeout_seconds: config.timeout_seconds(),
        })
    }

    /// Same endpoint and credentials, different model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                timeout_seconds: self.timeout_seconds,
            }
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let message = preview(body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { message },
        _ => LlmError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn extract_content(body: &str) -> Result<String, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("invalid JSON body: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response contained no choices".to_string()))?
        .message
        .content
        .ok_or_else(|| LlmError::MalformedResponse("first choice has no content".to_string()))
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = self.completions_url();

        tracing::debug!(
            url = %url,
            model = %self.model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            tracing::warn!(
                url = %url,
                model = %self.model,
                status = status.as_u16(),
                error_kind = err.kind(),
                "Chat completion request rejected by provider"
            );
            return Err(err);
        }

        let content = extract_content(&body)?;

        tracing::debug!(
            model = %self.model,
            response_length = content.len(),
            "Received chat completion"
        );

        Ok(content)
    }
}
