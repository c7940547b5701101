//! Conversation history stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use scylla::frame::value::CqlTimestamp;
use std::collections::HashMap;
use voice_orchestrator_core::{
    ConversationStore, MessageSource, PersistenceError, SessionId, TranscriptEntry,
};

use crate::schema::MESSAGES_TABLE;
use crate::ScyllaClient;

/// Process-local history, used when persistence is disabled and in tests
#[derive(Default)]
pub struct InMemoryConversationStore {
    sessions: Mutex<HashMap<SessionId, Vec<TranscriptEntry>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageSource,
        text: &str,
    ) -> Result<(), PersistenceError> {
        self.sessions
            .lock()
            .entry(session_id.clone())
            .or_default()
            .push(TranscriptEntry::new(session_id.clone(), role, text));
        Ok(())
    }

    async fn messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<TranscriptEntry>, PersistenceError> {
        Ok(self
            .sessions
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Next clustering sequence number for each live session
#[derive(Default)]
struct SessionSequences {
    next: Mutex<HashMap<SessionId, i64>>,
}

impl SessionSequences {
    fn next(&self, session_id: &SessionId) -> i64 {
        let mut sequences = self.next.lock();
        let seq = sequences.entry(session_id.clone()).or_insert(0);
        *seq += 1;
        *seq
    }

    fn forget(&self, session_id: &SessionId) {
        self.next.lock().remove(session_id);
    }

    fn live(&self) -> usize {
        self.next.lock().len()
    }
}

/// ScyllaDB-backed history
///
/// Lines are clustered by a per-session sequence number assigned here, so
/// reads return them in the order they were appended. Counters are dropped
/// when the session ends.
pub struct ScyllaConversationStore {
    client: ScyllaClient,
    sequences: SessionSequences,
}

impl ScyllaConversationStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self {
            client,
            sequences: SessionSequences::default(),
        }
    }
}

#[async_trait]
impl ConversationStore for ScyllaConversationStore {
    async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageSource,
        text: &str,
    ) -> Result<(), PersistenceError> {
        let seq = self.sequences.next(session_id);
        let now = Utc::now();

        let query = format!(
            "INSERT INTO {} (session_id, seq, role, text, created_at) VALUES (?, ?, ?, ?, ?)",
            self.client.table(MESSAGES_TABLE)
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    session_id.as_str(),
                    seq,
                    role.as_str(),
                    text,
                    CqlTimestamp(now.timestamp_millis()),
                ),
            )
            .await
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

        tracing::debug!(session_id = %session_id, seq, role = role.as_str(), "Message persisted");
        Ok(())
    }

    async fn messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<TranscriptEntry>, PersistenceError> {
        let query = format!(
            "SELECT role, text, created_at FROM {} WHERE session_id = ?",
            self.client.table(MESSAGES_TABLE)
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id.as_str(),))
            .await
            .map_err(|e| PersistenceError::QueryFailed(e.to_string()))?;

        let mut entries = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (role, text, created_at): (String, String, CqlTimestamp) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                entries.push(TranscriptEntry {
                    session_id: session_id.clone(),
                    source: parse_role(&role)?,
                    text,
                    at: DateTime::from_timestamp_millis(created_at.0).unwrap_or_else(Utc::now),
                });
            }
        }
        Ok(entries)
    }

    async fn end_session(&self, session_id: &SessionId) {
        self.sequences.forget(session_id);
        tracing::debug!(
            session_id = %session_id,
            live = self.sequences.live(),
            "Sequence counter released"
        );
    }
}

fn parse_role(role: &str) -> Result<MessageSource, PersistenceError> {
    match role {
        "user" => Ok(MessageSource::User),
        "agent" => Ok(MessageSource::Agent),
        other => Err(PersistenceError::InvalidData(format!(
            "unknown message role '{}'",
            other
        ))),
    }
}
