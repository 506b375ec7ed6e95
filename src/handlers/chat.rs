//! Chat endpoint handlers
//!
//! Handles POST /chat plus the session and agent listing endpoints.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::session::{ChatTurn, Message};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Maximum allowed message length in characters (100K chars)
const MAX_MESSAGE_LENGTH: usize = 100_000;

/// Chat request from client
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    message: String,
    session_id: Option<Uuid>,
}

impl ChatRequest {
    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Session to continue, if any
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }
}

/// Custom Deserialize implementation that validates during deserialization
impl<'de> Deserialize<'de> for ChatRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawChatRequest {
            message: String,
            #[serde(default)]
            session_id: Option<Uuid>,
        }

        let raw = RawChatRequest::deserialize(deserializer)?;

        if raw.message.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "message cannot be empty or contain only whitespace",
            ));
        }

        // Count Unicode characters, not bytes
        let char_count = raw.message.chars().count();
        if char_count > MAX_MESSAGE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "message exceeds maximum length of {} characters (got {})",
                MAX_MESSAGE_LENGTH, char_count
            )));
        }

        Ok(ChatRequest {
            message: raw.message,
            session_id: raw.session_id,
        })
    }
}

/// Chat response to client
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub turn: ChatTurn,
}

/// Transcript of one session
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
}

/// Public view of an agent (canned content omitted)
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub key: String,
    pub description: String,
}

/// POST /chat
///
/// Continues the session named by `session_id`, or starts a new one when
/// it is absent or unknown. Never fails because of the completion API:
/// failures come back as `notice` with the default agent's reply.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let existing = match request.session_id() {
        Some(id) => {
            let found = state.sessions().get(id).await;
            if found.is_none() {
                tracing::debug!(session_id = %id, "Unknown session id, starting a new session");
            }
            found
        }
        None => None,
    };

    let handle = match existing {
        Some(handle) => handle,
        None => state.sessions().insert(state.new_session()).await.1,
    };

    let mut session = handle.lock().await;
    let turn = session.handle(request.message(), state.router()).await;
    let session_id = session.id();
    drop(session);

    // Ended or evicted while the turn ran; the turn is returned but not kept
    if !state.sessions().contains(session_id).await {
        tracing::warn!(
            session_id = %session_id,
            agent = %turn.agent,
            "Session ended during chat turn, transcript discarded"
        );
    }

    Ok(Json(ChatResponse { session_id, turn }))
}

/// GET /sessions/{id}/transcript
pub async fn transcript_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TranscriptResponse>> {
    let handle = state
        .sessions()
        .get(id)
        .await
        .ok_or(AppError::SessionNotFound(id))?;
    let session = handle.lock().await;

    Ok(Json(TranscriptResponse {
        session_id: id,
        messages: session.transcript().to_vec(),
    }))
}

/// DELETE /sessions/{id}
pub async fn end_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.sessions().remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(id))
    }
}

/// GET /agents
pub async fn agents_handler(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    Json(
        state
            .registry()
            .agents()
            .iter()
            .map(|agent| AgentSummary {
                key: agent.key().to_string(),
                description: agent.description().to_string(),
            })
            .collect(),
    )
}
