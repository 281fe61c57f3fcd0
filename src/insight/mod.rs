//! AI-generated commentary on the selected indicator.

pub mod client;
pub mod orchestrator;

pub use client::{ChatCompletionClient, InsightClient, PERSONA};
pub use orchestrator::InsightOrchestrator;
