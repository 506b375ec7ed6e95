//! Prometheus metrics collection for agentroute
//!
//! This module provides metrics instrumentation for tracking:
//! - Routing decisions by agent and decision path
//! - Classifier call latency
//! - Completion call failures by flow and reason
//! - Personality requests by outcome
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::llm::LlmError;
use crate::router::RoutingPath;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Which flow issued a completion call
///
/// Restricts the `flow` label to known values at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Intent classification for the chat router
    Routing,
    /// Personality generation
    Personality,
}

impl Flow {
    /// Convert flow to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Routing => "routing",
            Flow::Personality => "personality",
        }
    }
}

/// Outcome of a personality request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalityOutcome {
    Generated,
    Failed,
}

impl PersonalityOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityOutcome::Generated => "generated",
            PersonalityOutcome::Failed => "failed",
        }
    }
}

/// Metrics collector for agentroute
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    routing_decisions: IntCounterVec,
    classification_duration: Histogram,
    llm_failures: IntCounterVec,
    personality_requests: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: registered agents × 3 paths (bounded by the agent registry)
        let routing_decisions = IntCounterVec::new(
            Opts::new(
                "agentroute_routing_decisions_total",
                "Total routing decisions by selected agent and decision path",
            ),
            &["agent", "path"],
        )?;

        let classification_duration = Histogram::with_opts(
            HistogramOpts::new(
                "agentroute_classification_duration_ms",
                "Classifier completion call latency in milliseconds",
            )
            .buckets(vec![
                10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ]),
        )?;

        let llm_failures = IntCounterVec::new(
            Opts::new(
                "agentroute_llm_failures_total",
                "Completion call failures by flow and failure reason",
            ),
            &["flow", "reason"],
        )?;

        let personality_requests = IntCounterVec::new(
            Opts::new(
                "agentroute_personality_requests_total",
                "Personality generation requests by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(routing_decisions.clone()))?;
        registry.register(Box::new(classification_duration.clone()))?;
        registry.register(Box::new(llm_failures.clone()))?;
        registry.register(Box::new(personality_requests.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            routing_decisions,
            classification_duration,
            llm_failures,
            personality_requests,
        })
    }

    /// Record a routing decision
    pub fn record_routing_decision(
        &self,
        agent: &str,
        path: RoutingPath,
    ) -> Result<(), prometheus::Error> {
        self.routing_decisions
            .get_metric_with_label_values(&[agent, path.as_str()])?
            .inc();
        Ok(())
    }

    /// Record classifier call latency
    pub fn record_classification_duration(&self, duration_ms: f64) {
        self.classification_duration.observe(duration_ms);
    }

    /// Record a failed completion call
    pub fn record_llm_failure(&self, flow: Flow, error: &LlmError) -> Result<(), prometheus::Error> {
        self.llm_failures
            .get_metric_with_label_values(&[flow.as_str(), error.kind()])?
            .inc();
        Ok(())
    }

    /// Record a personality request outcome
    pub fn record_personality(&self, outcome: PersonalityOutcome) -> Result<(), prometheus::Error> {
        self.personality_requests
            .get_metric_with_label_values(&[outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Current count of routing decisions for one label pair
    pub fn routing_decisions_count(&self, agent: &str, path: RoutingPath) -> u64 {
        self.routing_decisions
            .get_metric_with_label_values(&[agent, path.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current count of completion failures for one label pair
    pub fn llm_failures_count(&self, flow: Flow, reason: &str) -> u64 {
        self.llm_failures
            .get_metric_with_label_values(&[flow.as_str(), reason])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current count of personality requests with the given outcome
    pub fn personality_count(&self, outcome: PersonalityOutcome) -> u64 {
        self.personality_requests
            .get_metric_with_label_values(&[outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("Failed to encode metrics: {}", e))?;
        String::from_utf8(buffer).map_err(|e| format!("Metrics output is not UTF-8: {}", e))
    }
}
