//! Chat turn service
//!
//! One call per user message: validate, load history, run the graph,
//! persist, answer. Persistence failures are logged and counted but never
//! change the answer.

use std::sync::Arc;
use std::time::Instant;

use hermes_agent::{format_history, HermesGraph};
use hermes_config::constants::llm::APOLOGY_RESPONSE;
use hermes_config::Threshold;
use hermes_core::{create_initial_state, DataCollectionProgress, GraphState};
use hermes_persistence::{ConversationStore, ConversationTurn, NewTurn};

use crate::{ServerError, MISSING_MESSAGE};

/// Incoming chat message
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub message: String,
    pub user_ip: Option<String>,
    pub conversation_id: Option<String>,
}

/// Answer to a chat message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
}

pub struct ChatService {
    graph: Arc<HermesGraph>,
    store: Arc<dyn ConversationStore>,
    history_limit: usize,
}

impl ChatService {
    pub fn new(
        graph: Arc<HermesGraph>,
        store: Arc<dyn ConversationStore>,
        history_limit: usize,
    ) -> Self {
        Self {
            graph,
            store,
            history_limit,
        }
    }

    pub fn graph(&self) -> &HermesGraph {
        &self.graph
    }

    /// Process one chat message
    pub async fn handle(&self, turn: ChatTurn) -> Result<ChatReply, ServerError> {
        if turn.message.trim().is_empty() {
            return Err(ServerError::InvalidRequest(MISSING_MESSAGE.to_string()));
        }

        let started = Instant::now();
        metrics::counter!("hermes_chat_requests_total").increment(1);

        let conversation_id = turn
            .conversation_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let history = match &conversation_id {
            Some(id) => self.load_history(id).await,
            None => Vec::new(),
        };
        let history_context = format_history(
            history
                .iter()
                .map(|t| (t.user_message.as_str(), t.bot_response.as_str())),
        );

        let mut state = create_initial_state(turn.message, conversation_id.clone(), turn.user_ip);
        // Resume data collection where the previous turn left it
        if let Some(stage) = history.last().and_then(|t| t.collection_stage) {
            state.data_collection_stage = Some(DataCollectionProgress {
                current_stage: stage,
                questions_asked: Vec::new(),
                pending_questions: Vec::new(),
            });
        }
        state.collected_data = history
            .iter()
            .rev()
            .find_map(|t| t.collected_data.clone());

        let state = self.graph.run(state, &history_context).await?;

        let conversation_id =
            conversation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let response = state
            .response
            .clone()
            .unwrap_or_else(|| APOLOGY_RESPONSE.to_string());

        self.persist(self.new_turn(&state, &conversation_id, &response))
            .await;

        metrics::histogram!("hermes_chat_turn_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            conversation_id = %conversation_id,
            execution_id = %state.metadata.execution_id,
            history_turns = history.len(),
            errors = state.error_count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Chat turn completed"
        );

        Ok(ChatReply {
            response,
            conversation_id,
        })
    }

    async fn load_history(&self, conversation_id: &str) -> Vec<ConversationTurn> {
        match self.store.history(conversation_id, self.history_limit).await {
            Ok(turns) => turns,
            Err(e) => {
                metrics::counter!("hermes_persistence_failures_total", "operation" => "history")
                    .increment(1);
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Failed to load conversation history, continuing without it"
                );
                Vec::new()
            }
        }
    }

    fn new_turn(&self, state: &GraphState, conversation_id: &str, response: &str) -> NewTurn {
        let min_confidence = self
            .graph
            .config()
            .threshold_for(Threshold::IntentConfidence);
        NewTurn {
            conversation_id: conversation_id.to_string(),
            user_message: state.message.clone(),
            bot_response: response.to_string(),
            user_ip: state.user_context.ip.clone(),
            intent: state
                .trusted_intent(min_confidence)
                .map(|intent| intent.intent_type.as_str().to_string()),
            lead_score: state.interest_level.as_ref().map(|i| i.lead_score()),
            collection_stage: state.collection_stage(),
            collected_data: state.collected_data.clone(),
        }
    }

    async fn persist(&self, turn: NewTurn) {
        let conversation_id = turn.conversation_id.clone();
        if let Err(e) = self.store.append_turn(turn).await {
            metrics::counter!("hermes_persistence_failures_total", "operation" => "append")
                .increment(1);
            tracing::error!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to persist conversation turn"
            );
        }
    }
}
