//! Core traits and types for the voice conversation orchestrator
//!
//! This crate provides the foundational types shared by every other crate:
//! - Session state model (states, session record, connection status)
//! - Transcript, context-update and tool-call types
//! - Error taxonomy (transport, monitor, tool, persistence)
//! - Collaborator traits for the speech engine, audio input, agent
//!   transport, change feed, stores and tools

pub mod audio;
pub mod context;
pub mod error;
pub mod session;
pub mod tool_call;
pub mod traits;
pub mod transcript;

pub use audio::{normalize_level, rms_energy, LevelFrame};
pub use context::{ContextKind, ContextUpdate};
pub use error::{
    Error, MonitorError, PersistenceError, Result, ToolError, TransportError,
};
pub use session::{ConnectionStatus, ConversationSession, DisplayState, SessionId, SessionState};
pub use tool_call::{ToolCallRequest, ToolCallResult, ERROR_PREFIX};
pub use transcript::{MessageSource, TranscriptEntry, TranscriptPair};

pub use traits::{
    // Cue
    AcknowledgmentCue,
    // Transport
    AgentTransport,
    // Audio
    AudioInput,
    // Change feed
    ChangeEvent,
    ChangeFeed,
    ChangeOp,
    ChangeStream,
    // Stores
    ConversationStore,
    FeedFilter,
    FeedTable,
    InputSchema,
    LevelSource,
    LevelStream,
    ParamType,
    PropertySchema,
    // Speech
    RecognizerEvent,
    RecognizerStream,
    SessionConfig,
    SessionEventLog,
    SessionLogKind,
    SessionLogRecord,
    SpeechRecognizer,
    // Tools
    Tool,
    ToolParameters,
    ToolSchema,
    TransportEvent,
    TransportEventSender,
    TransportHandle,
};
