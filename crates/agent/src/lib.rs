//! Processing graph for the Hermes sales assistant
//!
//! Features:
//! - Keyword-based interest scoring
//! - LLM intent classification with tolerant JSON parsing
//! - Knowledge retrieval through the core search traits
//! - Staged data collection (email, business, requirements, preferences)
//! - Explicit node FSM with per-call timeouts and retries
//! - Execution logging shared across turns

pub mod actions;
pub mod collection;
pub mod execution_log;
pub mod graph;
pub mod intent;
pub mod interest;

pub use actions::derive_next_actions;
pub use collection::{advance_stage, extract_collected_data, fallback_question};
pub use execution_log::{CorrelationToken, ExecutionLogger, ExecutionRecord, NodeOutput};
pub use graph::{format_history, next_node, Collaborators, GraphNode, GraphOptions, HermesGraph};
pub use intent::{intent_search_terms, parse_intent_response};
pub use interest::{assess_interest, classify_level, compute_score, derive_signals, signal_weight};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Intent parse error: {0}")]
    IntentParse(String),

    #[error("Node {node} failed: {message}")]
    Node { node: String, message: String },

    #[error(transparent)]
    Core(#[from] hermes_core::Error),
}

impl From<AgentError> for hermes_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Core(inner) => inner,
            AgentError::InvalidState(message) => hermes_core::Error::Validation(message),
            other => hermes_core::Error::Llm(other.to_string()),
        }
    }
}
