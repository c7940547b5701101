//! Collaborator traits consumed by the orchestrator
//!
//! Every external system the orchestrator talks to sits behind one of these
//! traits, so backends can be swapped and tests can use scripted fakes.
//!
//! ```text
//! Speech:
//!   - SpeechRecognizer: continuous recognition loop (wake phrases)
//!
//! Audio:
//!   - AudioInput: microphone loudness frames (VAD, barge-in)
//!   - LevelSource: live input/output level probe (visualizer)
//!
//! Transport:
//!   - AgentTransport / TransportHandle: remote conversational agent
//!
//! State:
//!   - ChangeFeed: live household change feed
//!   - ConversationStore: conversation history
//!   - SessionEventLog: structured per-session event log
//!
//! Tools:
//!   - Tool: agent-invokable local operation with parameter schema
//! ```

mod audio;
mod cue;
mod feed;
mod speech;
mod store;
mod tool;
mod transport;

pub use audio::{AudioInput, LevelSource, LevelStream};
pub use cue::AcknowledgmentCue;
pub use feed::{ChangeEvent, ChangeFeed, ChangeOp, ChangeStream, FeedFilter, FeedTable};
pub use speech::{RecognizerEvent, RecognizerStream, SpeechRecognizer};
pub use store::{ConversationStore, SessionEventLog, SessionLogKind, SessionLogRecord};
pub use tool::{InputSchema, ParamType, PropertySchema, Tool, ToolParameters, ToolSchema};
pub use transport::{
    AgentTransport, SessionConfig, TransportEvent, TransportEventSender, TransportHandle,
};
