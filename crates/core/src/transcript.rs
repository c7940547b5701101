//! Transcript types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SessionId;

/// Who produced a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    User,
    Agent,
}

impl MessageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

/// One transcript line of an open session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub session_id: SessionId,
    pub source: MessageSource,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(session_id: SessionId, source: MessageSource, text: impl Into<String>) -> Self {
        Self {
            session_id,
            source,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Most recent user and agent lines, as shown by the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptPair {
    pub last_user_text: Option<String>,
    pub last_agent_text: Option<String>,
}

impl TranscriptPair {
    pub fn record(&mut self, source: MessageSource, text: &str) {
        match source {
            MessageSource::User => self.last_user_text = Some(text.to_string()),
            MessageSource::Agent => self.last_agent_text = Some(text.to_string()),
        }
    }

    pub fn clear(&mut self) {
        self.last_user_text = None;
        self.last_agent_text = None;
    }
}
