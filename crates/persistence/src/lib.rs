//! ScyllaDB persistence layer for the Hermes assistant
//!
//! Stores conversation turns so later turns can load their history and
//! resume data collection where the previous turn left it.

pub mod client;
pub mod conversations;
pub mod error;
pub mod schema;

pub use client::{ScyllaClient, ScyllaConfig};
pub use conversations::{
    ConversationStore, ConversationTurn, InMemoryConversationStore, NewTurn,
    ScyllaConversationStore,
};
pub use error::PersistenceError;

/// Connect to ScyllaDB, ensure the schema and build the conversation store
pub async fn init(config: ScyllaConfig) -> Result<ScyllaConversationStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaConversationStore::new(client))
}
