//! Intent classification router
//!
//! Asks the completion model which registered agent should answer a message,
//! then applies two deterministic rules on top of the model's answer:
//!
//! - a catalog product named in the message forces the `sales` agent,
//!   whatever the model said (or whether the call succeeded at all);
//! - anything that is not exactly a registered key after trimming and
//!   lowercasing falls back to the `default` agent.
//!
//! Routing never fails. A failed call only adds a user-visible notice.

use super::{AgentRegistry, DEFAULT_AGENT, RoutingOutcome, RoutingPath, SALES_AGENT};
use crate::catalog::ProductCatalog;
use crate::llm::{ChatMessage, CompletionClient, LlmError};
use crate::metrics::{Flow, Metrics};
use std::sync::Arc;
use std::time::Instant;

/// System instruction sent with every classification request
pub const CLASSIFIER_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Respond ONLY with a role key.";

/// Build the user-side classification prompt
///
/// Lists every agent in registry order as `- key: description`.
pub fn build_classification_prompt(query: &str, registry: &AgentRegistry) -> String {
    let role_descriptions = registry
        .agents()
        .iter()
        .map(|agent| format!("- {}: {}", agent.key(), agent.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let keys: Vec<&str> = registry.keys().collect();

    format!(
        "Classify the following query into one of the predefined roles below:\n\n\
         Query: {}\n\n\
         Roles:\n{}\n\n\
         Choose the best role for the query. Respond ONLY with the role key: {}.",
        query,
        role_descriptions,
        format_key_list(&keys)
    )
}

/// "a", "a or b", "a, b, or c"
fn format_key_list(keys: &[&str]) -> String {
    match keys {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

/// Accept a classifier reply only if it names a registered agent exactly
///
/// The reply is trimmed and lowercased first. No keyword search is done:
/// "sales." or "I'd pick sales" are rejected.
pub fn parse_agent_key<'a>(reply: &str, registry: &'a AgentRegistry) -> Option<&'a str> {
    let normalized = reply.trim().to_lowercase();
    registry.get(&normalized).map(|agent| agent.key())
}

/// Router that combines LLM intent classification with the product override
pub struct IntentRouter {
    client: Arc<dyn CompletionClient>,
    catalog: Arc<ProductCatalog>,
    metrics: Arc<Metrics>,
}

impl IntentRouter {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        catalog: Arc<ProductCatalog>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            client,
            catalog,
            metrics,
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Route `input` to one of the agents in `registry`
    ///
    /// Always issues exactly one completion call, then decides. The returned
    /// key is guaranteed to be registered.
    pub async fn route(&self, input: &str, registry: &AgentRegistry) -> RoutingOutcome {
        let prompt = build_classification_prompt(input, registry);
        let messages = [
            ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        tracing::debug!(
            prompt_length = messages[1].content.len(),
            input_length = input.len(),
            agent_count = registry.len(),
            "Built classification prompt"
        );

        let started = Instant::now();
        let reply = self.client.complete(&messages).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.metrics.record_classification_duration(elapsed_ms);

        let outcome = self.decide(input, registry, reply);

        if let Err(e) = self
            .metrics
            .record_routing_decision(&outcome.agent, outcome.path)
        {
            tracing::warn!(error = %e, "Failed to record routing decision metric");
        }

        tracing::info!(
            agent = %outcome.agent,
            path = outcome.path.as_str(),
            classification_ms = elapsed_ms,
            had_notice = outcome.notice.is_some(),
            "Routed chat message"
        );

        outcome
    }

    /// Apply the routing rules to a completed (or failed) classifier call
    fn decide(
        &self,
        input: &str,
        registry: &AgentRegistry,
        reply: Result<String, LlmError>,
    ) -> RoutingOutcome {
        let notice = match &reply {
            Ok(_) => None,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    error_kind = e.kind(),
                    "Classifier call failed"
                );
                if let Err(me) = self.metrics.record_llm_failure(Flow::Routing, e) {
                    tracing::warn!(error = %me, "Failed to record LLM failure metric");
                }
                Some(format!("Error determining agent: {}", e))
            }
        };

        if let Some(product) = self.catalog.find(input) {
            tracing::debug!(
                product = %product.name(),
                "Product named in message, forcing sales agent"
            );
            let outcome = RoutingOutcome::new(SALES_AGENT, RoutingPath::ProductMatch)
                .with_product_detail(product.describe());
            return match notice {
                Some(n) => outcome.with_notice(n),
                None => outcome,
            };
        }

        match reply {
            Ok(text) => match parse_agent_key(&text, registry) {
                Some(key) => RoutingOutcome::new(key, RoutingPath::Classifier),
                None => {
                    tracing::warn!(
                        reply = %crate::llm::preview(&text),
                        reply_length = text.len(),
                        "Classifier reply is not a registered agent key, using default agent"
                    );
                    RoutingOutcome::new(DEFAULT_AGENT, RoutingPath::Fallback)
                }
            },
            Err(_) => {
                let outcome = RoutingOutcome::new(DEFAULT_AGENT, RoutingPath::Fallback);
                match notice {
                    Some(n) => outcome.with_notice(n),
                    None => outcome,
                }
            }
        }
    }
}
