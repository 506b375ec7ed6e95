//! Property tests for intent routing
//!
//! Whatever the model replies and whatever the user types, the selected
//! agent is always a registered key, and a named product always wins.

use agentroute::catalog::ProductCatalog;
use agentroute::llm::{ChatMessage, CompletionClient, LlmError};
use agentroute::metrics::Metrics;
use agentroute::router::intent::parse_agent_key;
use agentroute::router::{AgentRegistry, IntentRouter};
use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::Arc;

struct CannedClient(Result<String, LlmError>);

#[async_trait]
impl CompletionClient for CannedClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.0.clone()
    }
}

fn route_blocking(reply: Result<String, LlmError>, input: &str) -> String {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("should build runtime");
    let router = IntentRouter::new(
        Arc::new(CannedClient(reply)),
        Arc::new(ProductCatalog::builtin()),
        Arc::new(Metrics::new().expect("should create metrics")),
    );
    let registry = AgentRegistry::builtin();
    runtime
        .block_on(router.route(input, &registry))
        .agent
}

fn model_reply() -> impl Strategy<Value = Result<String, LlmError>> {
    prop_oneof![
        ".{0,40}".prop_map(Ok::<String, LlmError>),
        prop::sample::select(vec!["default", "sales", "support", "faq", "escalation"])
            .prop_map(|k| Ok(format!("  {}\n", k.to_uppercase()))),
        ".{0,20}".prop_map(|m| Err(LlmError::Network(m))),
        Just(Err(LlmError::Timeout { timeout_seconds: 30 })),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn selected_agent_is_always_registered(reply in model_reply(), input in ".{0,80}") {
        let registry = AgentRegistry::builtin();
        let agent = route_blocking(reply, &input);
        prop_assert!(registry.contains(&agent), "unregistered agent {}", agent);
    }

    #[test]
    fn named_product_always_routes_to_sales(
        reply in model_reply(),
        prefix in "[a-z ]{0,20}",
        suffix in "[a-z ?]{0,20}",
        upper in any::<bool>(),
    ) {
        let name = if upper { "EPSON T3 SCARA ROBOT" } else { "epson t3 scara robot" };
        let input = format!("{}{}{}", prefix, name, suffix);
        prop_assert_eq!(route_blocking(reply, &input), "sales");
    }

    #[test]
    fn parsed_key_is_registered_or_none(reply in ".{0,30}") {
        let registry = AgentRegistry::builtin();
        if let Some(key) = parse_agent_key(&reply, &registry) {
            prop_assert!(registry.contains(key));
            prop_assert_eq!(key, reply.trim().to_lowercase());
        }
    }
}
