//! Conversation turn storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use hermes_core::{CollectedData, CollectionStage};

use crate::{PersistenceError, ScyllaClient};

/// Turn to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTurn {
    pub conversation_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub user_ip: Option<String>,
    /// Intent tag, e.g. "landing_page"
    pub intent: Option<String>,
    pub lead_score: Option<i32>,
    /// Data collection stage reached on this turn
    pub collection_stage: Option<CollectionStage>,
    /// Everything collected from the lead up to and including this turn
    pub collected_data: Option<CollectedData>,
}

/// Stored turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub conversation_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub user_ip: Option<String>,
    pub intent: Option<String>,
    pub lead_score: Option<i32>,
    pub collection_stage: Option<CollectionStage>,
    pub collected_data: Option<CollectedData>,
    pub turn_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    fn from_new(turn: NewTurn, created_at: DateTime<Utc>) -> Self {
        Self {
            conversation_id: turn.conversation_id,
            user_message: turn.user_message,
            bot_response: turn.bot_response,
            user_ip: turn.user_ip,
            intent: turn.intent,
            lead_score: turn.lead_score,
            collection_stage: turn.collection_stage,
            collected_data: turn.collected_data,
            turn_id: Uuid::new_v4(),
            created_at,
        }
    }
}

/// Conversation store
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append one turn to its conversation
    async fn append_turn(&self, turn: NewTurn) -> Result<(), PersistenceError>;

    /// The most recent `limit` turns of a conversation, oldest first
    async fn history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PersistenceError>;
}

/// ScyllaDB-backed conversation store
#[derive(Clone)]
pub struct ScyllaConversationStore {
    client: ScyllaClient,
}

impl ScyllaConversationStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConversationStore for ScyllaConversationStore {
    async fn append_turn(&self, turn: NewTurn) -> Result<(), PersistenceError> {
        let now = Utc::now();
        let collected_data_json = turn
            .collected_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        let query = format!(
            "INSERT INTO {}.conversations (
                conversation_id, created_at, turn_id, user_message, bot_response,
                user_ip, intent, lead_score, collection_stage, collected_data_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &turn.conversation_id,
                    now.timestamp_millis(),
                    Uuid::new_v4(),
                    &turn.user_message,
                    &turn.bot_response,
                    &turn.user_ip,
                    &turn.intent,
                    turn.lead_score,
                    turn.collection_stage.map(|s| s.as_str()),
                    collected_data_json,
                ),
            )
            .await?;

        tracing::debug!(
            conversation_id = %turn.conversation_id,
            intent = ?turn.intent,
            lead_score = ?turn.lead_score,
            "Conversation turn persisted"
        );

        Ok(())
    }

    async fn history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PersistenceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT conversation_id, created_at, turn_id, user_message, bot_response,
                    user_ip, intent, lead_score, collection_stage, collected_data_json
             FROM {}.conversations WHERE conversation_id = ?
             ORDER BY created_at DESC LIMIT ?",
            self.client.keyspace()
        );

        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let result = self
            .client
            .session()
            .query_unpaged(query, (conversation_id, limit))
            .await?;

        let mut turns = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (
                    conversation_id,
                    created_at,
                    turn_id,
                    user_message,
                    bot_response,
                    user_ip,
                    intent,
                    lead_score,
                    collection_stage,
                    collected_data_json,
                ): (
                    String,
                    i64,
                    Uuid,
                    String,
                    String,
                    Option<String>,
                    Option<String>,
                    Option<i32>,
                    Option<String>,
                    Option<String>,
                ) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                let collected_data = collected_data_json
                    .map(|json| serde_json::from_str::<CollectedData>(&json))
                    .transpose()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                turns.push(ConversationTurn {
                    conversation_id,
                    user_message,
                    bot_response,
                    user_ip,
                    intent,
                    lead_score,
                    collection_stage: collection_stage.and_then(|s| s.parse().ok()),
                    collected_data,
                    turn_id,
                    created_at: DateTime::from_timestamp_millis(created_at)
                        .unwrap_or_else(Utc::now),
                });
            }
        }

        // Queried newest first to apply the limit; callers want oldest first
        turns.reverse();
        Ok(turns)
    }
}

/// In-memory conversation store for tests and deployments without ScyllaDB
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of turns stored for a conversation
    pub fn turn_count(&self, conversation_id: &str) -> usize {
        self.conversations
            .read()
            .get(conversation_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append_turn(&self, turn: NewTurn) -> Result<(), PersistenceError> {
        let mut conversations = self.conversations.write();
        let turns = conversations
            .entry(turn.conversation_id.clone())
            .or_default();

        // Keep created_at strictly increasing within a conversation
        let mut created_at = Utc::now();
        if let Some(last) = turns.last() {
            if created_at <= last.created_at {
                created_at = last.created_at + chrono::Duration::milliseconds(1);
            }
        }

        turns.push(ConversationTurn::from_new(turn, created_at));
        Ok(())
    }

    async fn history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PersistenceError> {
        let conversations = self.conversations.read();
        let turns = match conversations.get(conversation_id) {
            Some(turns) => turns,
            None => return Ok(Vec::new()),
        };

        let skip = turns.len().saturating_sub(limit);
        Ok(turns[skip..].to_vec())
    }
}
