//! ScyllaDB schema creation

use scylla::Session;
use voice_orchestrator_core::PersistenceError;

/// Transcript lines, clustered in arrival order within a session
pub const MESSAGES_TABLE: &str = "conversation_messages";

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
    let messages_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.{} (
            session_id TEXT,
            seq BIGINT,
            role TEXT,
            text TEXT,
            created_at TIMESTAMP,
            PRIMARY KEY ((session_id), seq)
        ) WITH CLUSTERING ORDER BY (seq ASC)
    "#,
        keyspace, MESSAGES_TABLE
    );

    session.query_unpaged(messages_table, &[]).await.map_err(|e| {
        PersistenceError::SchemaError(format!("Failed to create {} table: {}", MESSAGES_TABLE, e))
    })?;

    Ok(())
}
