//! HTTP request handlers for the agentroute API

use crate::catalog::ProductCatalog;
use crate::config::Config;
use crate::error::AppResult;
use crate::llm::{CompletionClient, OpenAiClient};
use crate::metrics::Metrics;
use crate::personality::PersonalityGenerator;
use crate::router::{AgentRegistry, IntentRouter};
use crate::session::{ChatSession, SessionStore};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod chat;
pub mod health;
pub mod metrics;
pub mod personality;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    registry: Arc<AgentRegistry>,
    router: Arc<IntentRouter>,
    personality: Arc<PersonalityGenerator>,
    sessions: Arc<SessionStore>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Build state with explicit completion clients
    ///
    /// `classifier` serves the chat router, `generator` the personality flow.
    pub fn new(
        config: Config,
        classifier: Arc<dyn CompletionClient>,
        generator: Arc<dyn CompletionClient>,
        metrics: Arc<Metrics>,
    ) -> AppResult<Self> {
        let registry = Arc::new(config.agent_registry()?);
        let catalog: Arc<ProductCatalog> = Arc::new(config.product_catalog()?);
        let sessions = Arc::new(SessionStore::with_capacity(config.server.max_sessions));

        Ok(Self {
            router: Arc::new(IntentRouter::new(classifier, catalog, metrics.clone())),
            personality: Arc::new(PersonalityGenerator::new(generator, metrics.clone())),
            config: Arc::new(config),
            registry,
            sessions,
            metrics,
        })
    }

    /// Build state with OpenAI clients from configuration
    ///
    /// # Errors
    /// Fails if the API key environment variable is unset or the HTTP client
    /// cannot be built.
    pub fn from_config(config: Config, metrics: Arc<Metrics>) -> AppResult<Self> {
        let api_key = config.llm.api_key()?;
        let classifier = OpenAiClient::new(&config.llm, api_key)?;
        let generator = classifier.with_model(config.personality_model());
        Self::new(config, Arc::new(classifier), Arc::new(generator), metrics)
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Agent registry template copied into each new session
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn personality(&self) -> &PersonalityGenerator {
        &self.personality
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Fresh session: empty transcript, registry from configuration
    pub fn new_session(&self) -> ChatSession {
        ChatSession::new(
            (*self.registry).clone(),
            self.config.routing.substitute_product_detail,
        )
    }
}

/// Build the full HTTP application
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/agents", get(chat::agents_handler))
        .route("/chat", post(chat::handler))
        .route("/sessions/{id}/transcript", get(chat::transcript_handler))
        .route("/sessions/{id}", axum::routing::delete(chat::end_session_handler))
        .route("/personality", post(personality::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
