//! State transition helpers
//!
//! Each helper consumes the previous state and returns the next one, so a
//! state value is never observed half-updated.

use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

use crate::state::{ExecutionMetadata, GraphState, NodeError, NodeExecution, UserContext};

/// Build a fresh state for an incoming message
pub fn create_initial_state(
    message: impl Into<String>,
    conversation_id: Option<String>,
    user_ip: Option<String>,
) -> GraphState {
    GraphState {
        message: message.into(),
        conversation_id,
        user_context: UserContext {
            ip: user_ip,
            timestamp: Utc::now(),
        },
        intent: None,
        knowledge_context: None,
        interest_level: None,
        collected_data: None,
        data_collection_stage: None,
        response: None,
        metadata: ExecutionMetadata {
            execution_id: Uuid::new_v4().to_string(),
            node_executions: Vec::new(),
            errors: None,
        },
        next_actions: None,
    }
}

/// Whether the state carries the minimum every node relies on
///
/// `user_context` is a required field of the type, so only the message and
/// execution id can be missing.
pub fn validate_state(state: &GraphState) -> bool {
    !state.message.trim().is_empty() && !state.metadata.execution_id.is_empty()
}

/// Append a node execution record
pub fn record_node_execution(
    mut state: GraphState,
    node_name: impl Into<String>,
    success: bool,
    duration: Option<Duration>,
) -> GraphState {
    state.metadata.node_executions.push(NodeExecution {
        node_name: node_name.into(),
        timestamp: Utc::now(),
        duration_ms: duration.map(|d| d.as_millis() as u64),
        success,
    });
    state
}

/// Append an error record
///
/// Does not mark any execution as failed; callers that want that also call
/// [`record_node_execution`] with `success = false`.
pub fn record_error(
    mut state: GraphState,
    node_name: impl Into<String>,
    error: impl Into<String>,
) -> GraphState {
    state
        .metadata
        .errors
        .get_or_insert_with(Vec::new)
        .push(NodeError {
            node_name: node_name.into(),
            error: error.into(),
            timestamp: Utc::now(),
        });
    state
}
