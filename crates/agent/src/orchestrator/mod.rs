//! Session Orchestrator
//!
//! Owns the session state machine, the single open remote session and the
//! lifecycle of every local monitor.
//!
//! ## Architecture
//!
//! ```text
//!  WakePhraseListener ─┐
//!  VoiceActivity ──────┤
//!  BargeIn ────────────┤   Command    ┌───────────┐   open/close/interrupt  ┌───────────┐
//!  ContextFeed ────────┼─────────────▶│   actor   │────────────────────────▶│ transport │
//!  transport events ───┤  (one queue) │   loop    │◀── TransportEvent ──────│  handle   │
//!  public handle ──────┘              └─────┬─────┘                         └───────────┘
//!                                           │ watch / broadcast
//!                                           ▼
//!                                     snapshot, amplitude, events
//! ```
//!
//! Every input becomes a [`Command`] on one unbounded mailbox and is handled
//! to completion before the next one, so transitions apply in arrival order
//! and no callback ever touches orchestrator state directly.

mod actor;

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use voice_orchestrator_config::Settings;
use voice_orchestrator_core::{
    AcknowledgmentCue, AgentTransport, AudioInput, ChangeFeed, ConversationStore, DisplayState,
    SessionEventLog, SessionId, SessionState, SpeechRecognizer, Tool, TranscriptEntry,
    TranscriptPair,
};
use voice_orchestrator_persistence::{
    InMemoryConversationStore, PersistenceLayer, TracingEventLog,
};
use voice_orchestrator_tools::ToolRegistry;

use crate::events::{OrchestratorEvent, OrchestratorSnapshot};
use crate::monitors::MonitorKind;
use crate::OrchestratorError;

use actor::{Actor, Command};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// External systems the orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn AgentTransport>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub audio: Arc<dyn AudioInput>,
    pub cue: Option<Arc<dyn AcknowledgmentCue>>,
    pub change_feed: Option<Arc<dyn ChangeFeed>>,
    pub conversations: Arc<dyn ConversationStore>,
    pub events: Arc<dyn SessionEventLog>,
}

impl Collaborators {
    /// History kept in memory and session events sent to tracing
    pub fn new(
        transport: Arc<dyn AgentTransport>,
        recognizer: Arc<dyn SpeechRecognizer>,
        audio: Arc<dyn AudioInput>,
    ) -> Self {
        Self {
            transport,
            recognizer,
            audio,
            cue: None,
            change_feed: None,
            conversations: Arc::new(InMemoryConversationStore::new()),
            events: Arc::new(TracingEventLog::new()),
        }
    }

    pub fn with_cue(mut self, cue: Arc<dyn AcknowledgmentCue>) -> Self {
        self.cue = Some(cue);
        self
    }

    pub fn with_change_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.change_feed = Some(feed);
        self
    }

    pub fn with_persistence(mut self, layer: PersistenceLayer) -> Self {
        self.conversations = layer.conversations;
        self.events = layer.events;
        self
    }

    pub fn with_stores(
        mut self,
        conversations: Arc<dyn ConversationStore>,
        events: Arc<dyn SessionEventLog>,
    ) -> Self {
        self.conversations = conversations;
        self.events = events;
        self
    }
}

/// Result of [`SessionOrchestrator::start_conversation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session was opened and its handshake completed
    Opened(SessionId),
    /// A session was already open (or opening); nothing changed
    AlreadyOpen(SessionId),
}

impl StartOutcome {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::Opened(id) | Self::AlreadyOpen(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Opened(_))
    }
}

/// Handle to a running orchestrator
///
/// Dropping the handle ends any open session and stops every monitor.
pub struct SessionOrchestrator {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<OrchestratorSnapshot>,
    amplitude: watch::Receiver<f32>,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl SessionOrchestrator {
    /// Spawn the orchestrator on the current runtime
    ///
    /// It starts in `Idle` and moves to `Sleeping` once the startup grace
    /// delay has elapsed.
    pub fn spawn(settings: &Settings, collaborators: Collaborators, tools: ToolRegistry) -> Self {
        let (commands, mailbox) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(OrchestratorSnapshot::default());
        let (amplitude_tx, amplitude) = watch::channel(0.0_f32);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let actor = Actor::new(
            settings,
            collaborators,
            tools,
            commands.clone(),
            snapshot_tx,
            amplitude_tx,
            events.clone(),
        );
        tokio::spawn(actor.run(mailbox));

        Self {
            commands,
            snapshot,
            amplitude,
            events,
        }
    }

    /// Open a conversation, waiting for the transport handshake
    ///
    /// A no-op returning [`StartOutcome::AlreadyOpen`] while a session is
    /// open. On handshake failure a notice is raised, the orchestrator is back
    /// in `Sleeping` and the transport error is returned.
    pub async fn start_conversation(&self) -> Result<StartOutcome, OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start { reply })?;
        rx.await.map_err(|_| OrchestratorError::Closed)?
    }

    /// End the open conversation, if any, and return to `Sleeping`
    pub async fn end_conversation(&self) -> Result<(), OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::End { reply })?;
        rx.await.map_err(|_| OrchestratorError::Closed)
    }

    /// Register an extra tool; refused while a session is open
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::RegisterTool { tool, reply })?;
        rx.await.map_err(|_| OrchestratorError::Closed)?
    }

    /// Full transcript of the open session
    pub async fn transcript(&self) -> Result<Vec<TranscriptEntry>, OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Transcript { reply })?;
        rx.await.map_err(|_| OrchestratorError::Closed)
    }

    /// Monitors whose loops are running, after all queued commands are handled
    pub async fn active_monitors(&self) -> Result<Vec<MonitorKind>, OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ActiveMonitors { reply })?;
        rx.await.map_err(|_| OrchestratorError::Closed)
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn display_state(&self) -> DisplayState {
        self.snapshot.borrow().display_state
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<OrchestratorSnapshot> {
        self.snapshot.clone()
    }

    /// Most recent user and agent lines
    pub fn transcript_pair(&self) -> TranscriptPair {
        let snapshot = self.snapshot.borrow();
        TranscriptPair {
            last_user_text: snapshot.last_user_text.clone(),
            last_agent_text: snapshot.last_agent_text.clone(),
        }
    }

    /// Current visualizer level (0.0 - 1.0)
    pub fn amplitude(&self) -> f32 {
        *self.amplitude.borrow()
    }

    pub fn watch_amplitude(&self) -> watch::Receiver<f32> {
        self.amplitude.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// End any open session, stop every monitor and stop the actor
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Shutdown { reply: Some(reply) }).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) -> Result<(), OrchestratorError> {
        self.commands
            .send(command)
            .map_err(|_| OrchestratorError::Closed)
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown { reply: None });
    }
}
