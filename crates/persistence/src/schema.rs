//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // One partition per conversation, turns ordered oldest first; turn_id
    // keeps two turns written in the same millisecond apart
    let conversations_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.conversations (
            conversation_id TEXT,
            created_at BIGINT,
            turn_id UUID,
            user_message TEXT,
            bot_response TEXT,
            user_ip TEXT,
            intent TEXT,
            lead_score INT,
            collection_stage TEXT,
            collected_data_json TEXT,
            PRIMARY KEY ((conversation_id), created_at, turn_id)
        ) WITH CLUSTERING ORDER BY (created_at ASC, turn_id ASC)
    "#,
        keyspace
    );

    session
        .query_unpaged(conversations_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create conversations table: {}", e))
        })?;

    Ok(())
}
