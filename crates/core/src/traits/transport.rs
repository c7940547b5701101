//! Remote conversational-agent transport
//!
//! Transport callbacks are translated into [`TransportEvent`] messages at this
//! boundary. The orchestrator consumes them from one ordered queue instead of
//! registering closures that capture its state.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::{
    LevelSource, MessageSource, SessionId, ToolCallRequest, ToolCallResult, ToolSchema,
    TransportError,
};

/// Parameters of a remote session handshake
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Locally generated id, known before the handshake
    pub session_id: SessionId,
    /// Remote agent identifier, if the service hosts several
    pub agent_id: Option<String>,
    /// Tools the remote agent may invoke
    pub tools: Vec<ToolSchema>,
    /// Free-form values forwarded to the agent (user name, locale, ...)
    pub dynamic_variables: Map<String, Value>,
}

impl SessionConfig {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            agent_id: None,
            tools: Vec::new(),
            dynamic_variables: Map::new(),
        }
    }
}

/// Event raised by an open transport handle
#[derive(Debug)]
pub enum TransportEvent {
    Connected,
    Disconnected { reason: String },
    Error { reason: String },
    Message { source: MessageSource, text: String },
    SpeakingChanged(bool),
    /// Remote service decided the user turn is over
    TurnEnded,
    /// Agent-invoked tool; the result must be sent back on `reply`
    ToolCall {
        request: ToolCallRequest,
        reply: oneshot::Sender<ToolCallResult>,
    },
}

/// Sink handed to the transport when a session is opened
pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;

/// Connector to the remote conversational-agent service
#[async_trait]
pub trait AgentTransport: Send + Sync + 'static {
    /// Perform the handshake and return a live handle
    ///
    /// Events for this session must be sent on `events` until the handle is
    /// closed.
    async fn open(
        &self,
        config: SessionConfig,
        events: TransportEventSender,
    ) -> Result<Arc<dyn TransportHandle>, TransportError>;
}

/// Open remote session
#[async_trait]
pub trait TransportHandle: LevelSource + Send + Sync + 'static {
    /// Close the whole session; must be idempotent
    async fn close(&self);

    /// Cut the current agent utterance without closing the session
    async fn interrupt(&self) -> Result<(), TransportError>;

    /// Deliver an out-of-band context string into the session
    async fn send_context_update(&self, text: &str) -> Result<(), TransportError>;
}
