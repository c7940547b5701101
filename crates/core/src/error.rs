//! Error taxonomy
//!
//! Each error kind is contained at its origin except [`TransportError`],
//! which is the only kind allowed to force a session state transition.

use thiserror::Error;

/// Remote conversational-agent transport failures (handshake, connection loss)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A write on an open session (context update, interrupt) did not go out
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Transport timed out after {0}ms")]
    Timeout(u64),
}

/// Local speech-engine or audio-device failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Recognition error: {0}")]
    Recognition(String),
}

/// Failures raised inside a tool handler
///
/// These never cross the dispatch boundary: the registry converts them
/// into `ERROR:` strings for the remote agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn timeout(tool: &str, secs: u64) -> Self {
        Self::Timeout {
            tool: tool.to_string(),
            secs,
        }
    }
}

/// Conversation-history or event-log write failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Umbrella error for code that handles several kinds at once
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl Error {
    /// Whether this error is allowed to force the session back to sleep
    pub fn forces_transition(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
