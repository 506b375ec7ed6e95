//! Agent registry
//!
//! An agent is a canned-response profile the router can select. The registry
//! keeps definition order, which is also the order agents are listed in the
//! classification prompt.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key of the fallback agent, used whenever classification fails
pub const DEFAULT_AGENT: &str = "default";
/// Key forced by a product match
pub const SALES_AGENT: &str = "sales";

/// A canned-response profile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Agent {
    key: String,
    description: String,
    content: String,
}

impl Agent {
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            content: content.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Used inside the classification prompt
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Canned response shown when this agent is selected
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered set of agents with unique keys
///
/// Always contains [`DEFAULT_AGENT`] and [`SALES_AGENT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    /// Position of the `default` agent in `agents`
    default_index: usize,
}

impl AgentRegistry {
    /// Build a registry from explicit agents
    ///
    /// # Errors
    /// Keys must be non-empty, lowercase without surrounding whitespace (the
    /// classifier reply is trimmed and lowercased before comparison), and
    /// unique. `default` and `sales` must be present.
    pub fn new(agents: Vec<Agent>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for agent in &agents {
            if agent.key.is_empty() {
                return Err(AppError::Config("agent key cannot be empty".to_string()));
            }
            if agent.key != agent.key.trim().to_lowercase() {
                return Err(AppError::Config(format!(
                    "agent key '{}' must be lowercase with no surrounding whitespace",
                    agent.key
                )));
            }
            if !seen.insert(agent.key.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate agent key '{}'",
                    agent.key
                )));
            }
        }

        for required in [DEFAULT_AGENT, SALES_AGENT] {
            if !seen.contains(required) {
                return Err(AppError::Config(format!(
                    "agent registry must define a '{}' agent",
                    required
                )));
            }
        }

        let default_index = agents
            .iter()
            .position(|a| a.key == DEFAULT_AGENT)
            .ok_or_else(|| AppError::Internal("default agent vanished".to_string()))?;

        Ok(Self {
            agents,
            default_index,
        })
    }

    /// The built-in five-agent registry
    pub fn builtin() -> Self {
        Self {
            default_index: 0,
            agents: vec![
                Agent::new(
                    DEFAULT_AGENT,
                    "Routes queries to the appropriate agent.",
                    "Hello! I will help direct your query to the right expert.",
                ),
                Agent::new(
                    SALES_AGENT,
                    "Handles inquiries about FA Controls' robotics products and pricing.",
                    "Welcome! I can assist with product information, pricing, and comparisons. Here's an example:\n\n\
                     **Epson T3 SCARA Robot**:\n\
                     - Price: $8,000 (base model)\n\
                     - Features: Compact design, easy integration, high-speed assembly.\n\
                     For more details, visit: [Epson Robots](https://catalog.fa.com.my/Industrial-Robots).\n\n\
                     Let me know if you need help with other products or customized pricing!",
                ),
                Agent::new(
                    "support",
                    "Provides technical support for troubleshooting.",
                    "I'm here to assist with troubleshooting and technical support. Please describe your issue.",
                ),
                Agent::new(
                    "faq",
                    "Answers FAQs about pricing policies, shipping, and product comparisons.",
                    "Our pricing policies are designed to offer competitive value. For competitor comparisons, \
                     like ABB vs Epson T3, visit [Product Info](https://catalog.fa.com.my/Industrial-Robots).",
                ),
                Agent::new(
                    "escalation",
                    "Handles complex queries or escalations to human representatives.",
                    "I'm unable to assist further. Please contact Jacky Lim via WhatsApp using this link: \
                     [Contact Jacky Lim](http://wa.me/60122152688).",
                ),
            ],
        }
    }

    pub fn get(&self, key: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The fallback agent (always present)
    pub fn default_agent(&self) -> &Agent {
        &self.agents[self.default_index]
    }

    /// Look up `key`, falling back to the default agent
    pub fn resolve(&self, key: &str) -> &Agent {
        self.get(key).unwrap_or_else(|| self.default_agent())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.key.as_str())
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_keys_in_order() {
        let registry = AgentRegistry::builtin();
        let keys: Vec<_> = registry.keys().collect();
        assert_eq!(keys, ["default", "sales", "support", "faq", "escalation"]);
    }

    #[test]
    fn test_builtin_registry_passes_validation() {
        let builtin = AgentRegistry::builtin();
        let rebuilt = AgentRegistry::new(builtin.agents().to_vec()).expect("builtin is valid");
        assert_eq!(rebuilt, builtin);
    }

    #[test]
    fn test_sales_content_mentions_price() {
        let registry = AgentRegistry::builtin();
        assert!(registry.get(SALES_AGENT).unwrap().content().contains("$8,000"));
    }

    #[test]
    fn test_resolve_unknown_key_falls_back_to_default() {
        let registry = AgentRegistry::builtin();
        assert_eq!(registry.resolve("billing").key(), DEFAULT_AGENT);
        assert_eq!(registry.resolve("faq").key(), "faq");
    }

    #[test]
    fn test_new_requires_default_and_sales() {
        let err = AgentRegistry::new(vec![Agent::new("sales", "d", "c")]).unwrap_err();
        assert!(err.to_string().contains("'default'"));

        let err = AgentRegistry::new(vec![Agent::new("default", "d", "c")]).unwrap_err();
        assert!(err.to_string().contains("'sales'"));
    }

    #[test]
    fn test_new_rejects_duplicate_keys() {
        let err = AgentRegistry::new(vec![
            Agent::new("default", "d", "c"),
            Agent::new("sales", "d", "c"),
            Agent::new("sales", "d2", "c2"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate agent key"));
    }

    #[test]
    fn test_new_rejects_uppercase_keys() {
        let err = AgentRegistry::new(vec![
            Agent::new("default", "d", "c"),
            Agent::new("sales", "d", "c"),
            Agent::new("Support", "d", "c"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("lowercase"));
    }
}
