//! agentroute - intent-classifying chat router and personality generator
//!
//! Routes chat messages to canned agent replies by asking an OpenAI-compatible
//! model to classify intent, with a deterministic product-catalog override,
//! and generates personality blurbs from birthdates.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod metrics;
pub mod personality;
pub mod router;
pub mod session;
pub mod telemetry;
