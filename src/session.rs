//! Chat sessions
//!
//! A [`ChatSession`] owns everything one conversation needs: its agent
//! registry and its append-only transcript. Sessions are created empty,
//! never share state, and are torn down by dropping them.

use crate::router::{AgentRegistry, IntentRouter, RoutingOutcome, RoutingPath, SALES_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Who wrote a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One displayed transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Result of one chat turn, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    /// Selected agent key
    pub agent: String,
    /// Which routing path decided
    pub path: RoutingPath,
    /// Text shown as the assistant message
    pub reply: String,
    /// Non-fatal error notice to show alongside the reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Per-conversation state
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    registry: AgentRegistry,
    transcript: Vec<Message>,
    substitute_product_detail: bool,
}

impl ChatSession {
    /// New session with an empty transcript
    pub fn new(registry: AgentRegistry, substitute_product_detail: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            transcript: Vec::new(),
            substitute_product_detail,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Route `input` and dispatch the selected agent's reply
    pub async fn handle(&mut self, input: &str, router: &IntentRouter) -> ChatTurn {
        let outcome = router.route(input, &self.registry).await;
        self.dispatch(input, outcome)
    }

    /// Append the user message and the selected agent's reply, in that order
    ///
    /// The reply is the agent's canned text. When product substitution is
    /// enabled and a product forced the sales agent, the product detail is
    /// shown instead of the generic sales text.
    pub fn dispatch(&mut self, input: &str, outcome: RoutingOutcome) -> ChatTurn {
        let agent = self.registry.resolve(&outcome.agent);

        let reply = match outcome.product_detail {
            Some(detail)
                if self.substitute_product_detail
                    && outcome.path == RoutingPath::ProductMatch
                    && agent.key() == SALES_AGENT =>
            {
                detail
            }
            _ => agent.content().to_string(),
        };

        self.transcript.push(Message {
            role: Role::User,
            content: input.to_string(),
        });
        self.transcript.push(Message {
            role: Role::Assistant,
            content: reply.clone(),
        });

        tracing::debug!(
            session_id = %self.id,
            agent = %agent.key(),
            transcript_len = self.transcript.len(),
            "Dispatched agent reply"
        );

        ChatTurn {
            agent: agent.key().to_string(),
            path: outcome.path,
            reply,
            notice: outcome.notice,
        }
    }
}

/// Default upper bound on live sessions
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug)]
struct SessionEntry {
    handle: Arc<Mutex<ChatSession>>,
    last_used: u64,
}

/// Live sessions keyed by id
///
/// The store lock only guards the map; each session has its own lock, so
/// turns in different sessions never wait on each other. At capacity, the
/// least recently used session is evicted to make room for a new one.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    max_sessions: usize,
    clock: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    /// Store holding at most `max_sessions` sessions (minimum 1)
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            clock: AtomicU64::new(0),
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a new session and return its handle
    ///
    /// Evicts least recently used sessions while the store is full.
    pub async fn insert(&self, session: ChatSession) -> (Uuid, Arc<Mutex<ChatSession>>) {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        let mut sessions = self.sessions.write().await;

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(
                session_id = %oldest,
                max_sessions = self.max_sessions,
                "Evicted least recently used session"
            );
        }

        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_used: self.tick(),
            },
        );
        tracing::info!(session_id = %id, "Session started");
        (id, handle)
    }

    /// Look up a session and mark it as recently used
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_used = self.tick();
        Some(entry.handle.clone())
    }

    /// Whether `id` is live, without touching its recency
    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// End a session; returns false if it did not exist
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
