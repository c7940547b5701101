//! Observable orchestrator state for the UI layer

use serde::Serialize;
use voice_orchestrator_core::{
    ConnectionStatus, ContextKind, DisplayState, MessageSource, SessionId, SessionState,
};

/// Latest orchestrator state, published after every processed command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorSnapshot {
    pub state: SessionState,
    pub display_state: DisplayState,
    pub session_id: Option<SessionId>,
    pub connection: Option<ConnectionStatus>,
    pub last_user_text: Option<String>,
    pub last_agent_text: Option<String>,
}

impl OrchestratorSnapshot {
    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }
}

/// User-visible notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// The remote session could not be opened
    ConnectionFailed { reason: String },
    /// An open session dropped
    ConnectionLost { reason: String },
    /// A local monitor keeps failing; the session carries on without it
    Degraded { component: String, reason: String },
}

impl Notice {
    /// Text suitable for showing to the user
    pub fn message(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => "Connection failed, please try again.",
            Self::ConnectionLost { .. } => "The conversation was disconnected.",
            Self::Degraded { .. } => "Voice detection is having trouble, tap to talk instead.",
        }
    }
}

/// Events broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    DisplayChanged(DisplayState),
    SessionStarted {
        session_id: SessionId,
    },
    Connected {
        session_id: SessionId,
    },
    SessionEnded {
        session_id: SessionId,
        reason: String,
    },
    Transcript {
        session_id: SessionId,
        source: MessageSource,
        text: String,
    },
    ToolCompleted {
        session_id: SessionId,
        tool: String,
        result: String,
    },
    ContextSent {
        session_id: SessionId,
        kind: ContextKind,
    },
    BargeIn {
        session_id: SessionId,
    },
    Notice(Notice),
}
