//! Conversation history and session event log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MessageSource, PersistenceError, SessionId, TranscriptEntry};

/// Persistent conversation-history store
///
/// Writes are fire-and-forget from the orchestrator's perspective: failures
/// are logged and never affect session state.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageSource,
        text: &str,
    ) -> Result<(), PersistenceError>;

    /// Messages of a session in arrival order
    async fn messages(&self, session_id: &SessionId)
        -> Result<Vec<TranscriptEntry>, PersistenceError>;

    /// The session is over; no more lines will be appended for it
    async fn end_session(&self, _session_id: &SessionId) {}
}

/// Kind of a structured session event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLogKind {
    SessionStarted,
    Connected,
    StateChanged,
    Message,
    ToolCall,
    ContextSent,
    BargeIn,
    Notice,
    SessionEnded,
}

impl SessionLogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::Connected => "connected",
            Self::StateChanged => "state_changed",
            Self::Message => "message",
            Self::ToolCall => "tool_call",
            Self::ContextSent => "context_sent",
            Self::BargeIn => "barge_in",
            Self::Notice => "notice",
            Self::SessionEnded => "session_ended",
        }
    }
}

/// One structured event, keyed by session id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogRecord {
    pub session_id: SessionId,
    pub kind: SessionLogKind,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub detail: Value,
}

impl SessionLogRecord {
    pub fn new(session_id: SessionId, kind: SessionLogKind, detail: Value) -> Self {
        Self {
            session_id,
            kind,
            at: Utc::now(),
            detail,
        }
    }
}

/// Structured event log for later analysis
#[async_trait]
pub trait SessionEventLog: Send + Sync + 'static {
    async fn record(&self, record: &SessionLogRecord) -> Result<(), PersistenceError>;
}
