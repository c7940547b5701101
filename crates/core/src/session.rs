//! Session state model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator-wide session state (single source of truth)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Constructed, startup grace delay not yet elapsed
    #[default]
    Idle,
    /// Passive: only the wake-phrase listener runs
    Sleeping,
    /// Session open, expecting user speech
    Listening,
    /// User turn ended, waiting for the agent
    Processing,
    /// Agent audio is playing
    Speaking,
}

impl SessionState {
    /// States from which a conversation may be started
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Sleeping)
    }

    /// States that only exist while a conversation is open
    pub fn is_conversational(&self) -> bool {
        matches!(self, Self::Listening | Self::Processing | Self::Speaking)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sleeping => "sleeping",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation-only refinement of [`SessionState`]
///
/// `Acknowledged` is shown briefly after a user utterance and never gates a
/// real transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    #[default]
    Idle,
    Sleeping,
    Listening,
    Acknowledged,
    Processing,
    Speaking,
}

impl From<SessionState> for DisplayState {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Idle => Self::Idle,
            SessionState::Sleeping => Self::Sleeping,
            SessionState::Listening => Self::Listening,
            SessionState::Processing => Self::Processing,
            SessionState::Speaking => Self::Speaking,
        }
    }
}

/// Opaque session identifier, allocated locally before the remote handshake
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote session connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// One open remote conversation session
///
/// Owned exclusively by the orchestrator; other components only ever see
/// clones of it through snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: SessionId,
    pub status: ConnectionStatus,
    pub is_agent_speaking: bool,
    pub started_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            status: ConnectionStatus::Connecting,
            is_agent_speaking: false,
            started_at: Utc::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_start_only_when_passive() {
        assert!(SessionState::Idle.can_start());
        assert!(SessionState::Sleeping.can_start());
        assert!(!SessionState::Listening.can_start());
        assert!(!SessionState::Processing.can_start());
        assert!(!SessionState::Speaking.can_start());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_new_session_is_connecting() {
        let session = ConversationSession::new(SessionId::from("s-1"));
        assert_eq!(session.status, ConnectionStatus::Connecting);
        assert!(!session.is_connected());
        assert!(!session.is_agent_speaking);
    }

    #[test]
    fn test_display_state_mirrors_session_state() {
        assert_eq!(
            DisplayState::from(SessionState::Processing),
            DisplayState::Processing
        );
        assert_eq!(SessionState::Speaking.to_string(), "speaking");
    }
}
