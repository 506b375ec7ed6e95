//! Completion capability used by both flows
//!
//! The router and the personality generator only need "send these messages,
//! get one text back". [`CompletionClient`] is that seam; [`OpenAiClient`]
//! is the production implementation against an OpenAI-compatible
//! Chat Completions endpoint.

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum length of a remote error body kept in an [`LlmError`]
pub(crate) const MAX_ERROR_PREVIEW: usize = 500;

/// Role tag of a chat completion message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single role-tagged message sent to the completion API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Typed failure reasons for a completion call
///
/// Callers decide the fallback policy; this type only says what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Connection refused, DNS failure, TLS failure, body read interrupted
    #[error("network error: {0}")]
    Network(String),

    /// The client-side timeout elapsed before a response arrived
    #[error("request timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    /// 401/403 from the provider
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// 429 from the provider
    #[error("rate limited by provider: {message}")]
    RateLimited { message: String },

    /// Any other non-success HTTP status
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose body does not contain a completion
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Status { .. } => "status",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Something that turns an ordered list of messages into one text completion
///
/// Allows dependency injection so routing and prompt logic can be tested
/// without network calls.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` and return the first completion's text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// Truncate a remote message for inclusion in an error (char-safe)
pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > MAX_ERROR_PREVIEW {
        let truncated: String = text.chars().take(MAX_ERROR_PREVIEW).collect();
        format!("{}... [truncated]", truncated)
    } else {
        text.to_string()
    }
}
