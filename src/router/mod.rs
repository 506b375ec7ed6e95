//! Routing logic for agentroute
//!
//! Maps a chat message to exactly one registered agent key.

pub mod agents;
pub mod intent;

pub use agents::{Agent, AgentRegistry, DEFAULT_AGENT, SALES_AGENT};
pub use intent::IntentRouter;

use serde::{Deserialize, Serialize};

/// Which path produced a routing decision
///
/// Provides compile-time type safety for decision tracking
/// instead of using raw strings which are error-prone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPath {
    /// A catalog product was named in the message; forced to `sales`
    ProductMatch,
    /// The classifier reply was a registered key
    Classifier,
    /// Call failed or reply unrecognized; `default` agent
    Fallback,
}

impl RoutingPath {
    /// Convert to string representation for logging and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductMatch => "product_match",
            Self::Classifier => "classifier",
            Self::Fallback => "fallback",
        }
    }
}

/// Result of routing one message
///
/// `agent` is always a key of the registry the router was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingOutcome {
    /// Selected agent key
    pub agent: String,
    /// Which path made the decision
    pub path: RoutingPath,
    /// Non-fatal, user-visible error notice (set when the classifier call failed)
    pub notice: Option<String>,
    /// Formatted catalog entry when the decision was a product match
    pub product_detail: Option<String>,
}

impl RoutingOutcome {
    pub fn new(agent: impl Into<String>, path: RoutingPath) -> Self {
        Self {
            agent: agent.into(),
            path,
            notice: None,
            product_detail: None,
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    pub fn with_product_detail(mut self, detail: impl Into<String>) -> Self {
        self.product_detail = Some(detail.into());
        self
    }
}
