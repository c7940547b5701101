//! Orchestrator event loop

use futures::FutureExt;
use serde_json::{json, Value};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use voice_orchestrator_config::{OrchestratorSettings, Settings};
use voice_orchestrator_core::{
    AcknowledgmentCue, AgentTransport, ConnectionStatus, ContextUpdate, ConversationSession,
    DisplayState, MessageSource, SessionConfig, SessionId, SessionLogKind, SessionState, Tool,
    ToolCallRequest, ToolCallResult, TranscriptEntry, TranscriptPair, TransportError,
    TransportEvent, TransportHandle,
};
use voice_orchestrator_pipeline::{
    AmplitudeConfig, AmplitudeSampler, BargeInConfig, BargeInEvent, BargeInMonitor, EventSink,
    VadConfig, VadEvent, VoiceActivityMonitor, WakeConfig, WakeEvent, WakePhraseListener,
};
use voice_orchestrator_tools::ToolRegistry;

use super::{Collaborators, StartOutcome};
use crate::context::{feed_filter, ContextFeed, ContextThrottle};
use crate::events::{Notice, OrchestratorEvent, OrchestratorSnapshot};
use crate::history::HistoryWriter;
use crate::monitors::{MonitorKind, MonitorSet, Wanted};
use crate::OrchestratorError;

type StartReply = oneshot::Sender<Result<StartOutcome, OrchestratorError>>;

pub(crate) enum Command {
    Start {
        reply: StartReply,
    },
    End {
        reply: oneshot::Sender<()>,
    },
    RegisterTool {
        tool: Arc<dyn Tool>,
        reply: oneshot::Sender<Result<(), OrchestratorError>>,
    },
    Transcript {
        reply: oneshot::Sender<Vec<TranscriptEntry>>,
    },
    ActiveMonitors {
        reply: oneshot::Sender<Vec<MonitorKind>>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
    StartupGraceElapsed,
    AcknowledgmentElapsed {
        generation: u64,
    },
    HandshakeFinished {
        epoch: u64,
        result: Result<Arc<dyn TransportHandle>, TransportError>,
    },
    Transport {
        epoch: u64,
        event: TransportEvent,
    },
    Context {
        epoch: u64,
        update: ContextUpdate,
    },
    Wake {
        generation: u64,
        event: WakeEvent,
    },
    VoiceActivity {
        generation: u64,
        event: VadEvent,
    },
    BargeIn {
        generation: u64,
        event: BargeInEvent,
    },
}

/// The one open session
struct ActiveSession {
    session: ConversationSession,
    epoch: u64,
    handle: Option<Arc<dyn TransportHandle>>,
    ever_connected: bool,
    transcript: Vec<TranscriptEntry>,
}

impl ActiveSession {
    fn id(&self) -> &SessionId {
        &self.session.session_id
    }
}

pub(crate) struct Actor {
    settings: OrchestratorSettings,
    metrics_enabled: bool,
    transport: Arc<dyn AgentTransport>,
    cue: Option<Arc<dyn AcknowledgmentCue>>,
    registry: Arc<ToolRegistry>,
    monitors: MonitorSet,
    context_feed: Option<ContextFeed>,
    throttle: ContextThrottle,
    history: HistoryWriter,
    mailbox: mpsc::UnboundedSender<Command>,
    snapshot_tx: watch::Sender<OrchestratorSnapshot>,
    amplitude_tx: Arc<watch::Sender<f32>>,
    speaking_tx: watch::Sender<bool>,
    events_tx: broadcast::Sender<OrchestratorEvent>,

    state: SessionState,
    display: DisplayState,
    ack_generation: u64,
    ack_timer: Option<JoinHandle<()>>,
    startup_timer: Option<JoinHandle<()>>,
    epoch: u64,
    session: Option<ActiveSession>,
    pending_start: Option<StartReply>,
    pair: TranscriptPair,
}

impl Actor {
    pub(crate) fn new(
        settings: &Settings,
        collaborators: Collaborators,
        tools: ToolRegistry,
        mailbox: mpsc::UnboundedSender<Command>,
        snapshot_tx: watch::Sender<OrchestratorSnapshot>,
        amplitude_tx: watch::Sender<f32>,
        events_tx: broadcast::Sender<OrchestratorEvent>,
    ) -> Self {
        let monitors = MonitorSet::new(
            WakePhraseListener::new(collaborators.recognizer, WakeConfig::from(&settings.wake)),
            VoiceActivityMonitor::new(
                collaborators.audio.clone(),
                VadConfig::from(&settings.vad),
            ),
            BargeInMonitor::new(collaborators.audio, BargeInConfig::from(&settings.barge_in)),
            AmplitudeSampler::new(AmplitudeConfig::from(&settings.amplitude)),
        );

        let context_feed = match (collaborators.change_feed, feed_filter(&settings.context)) {
            (Some(feed), Some(filter)) => Some(ContextFeed::new(feed, filter)),
            _ => None,
        };

        let (history, _) = HistoryWriter::spawn(collaborators.conversations, collaborators.events);
        let (speaking_tx, _) = watch::channel(false);

        Self {
            settings: settings.orchestrator.clone(),
            metrics_enabled: settings.observability.metrics_enabled,
            transport: collaborators.transport,
            cue: collaborators.cue,
            registry: Arc::new(tools.with_metrics(settings.observability.metrics_enabled)),
            monitors,
            context_feed,
            throttle: ContextThrottle::new(Duration::from_millis(
                settings.context.throttle_window_ms,
            )),
            history,
            mailbox,
            snapshot_tx,
            amplitude_tx: Arc::new(amplitude_tx),
            speaking_tx,
            events_tx,
            state: SessionState::Idle,
            display: DisplayState::Idle,
            ack_generation: 0,
            ack_timer: None,
            startup_timer: None,
            epoch: 0,
            session: None,
            pending_start: None,
            pair: TranscriptPair::default(),
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let grace = Duration::from_millis(self.settings.startup_grace_ms);
        self.startup_timer = Some(self.schedule(grace, Command::StartupGraceElapsed));
        tracing::info!(
            tools = self.registry.len(),
            startup_grace_ms = self.settings.startup_grace_ms,
            "Session orchestrator started"
        );

        while let Some(command) = commands.recv().await {
            match command {
                Command::Shutdown { reply } => {
                    self.shutdown().await;
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    break;
                }
                command => {
                    self.handle(command).await;
                    self.publish();
                }
            }
        }
        tracing::info!("Session orchestrator stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start { reply } => self.open_session("request", Some(reply)).await,
            Command::End { reply } => {
                self.end_conversation("ended by user").await;
                let _ = reply.send(());
            }
            Command::RegisterTool { tool, reply } => {
                let _ = reply.send(self.register_tool(tool));
            }
            Command::Transcript { reply } => {
                let transcript = self
                    .session
                    .as_ref()
                    .map(|s| s.transcript.clone())
                    .unwrap_or_default();
                let _ = reply.send(transcript);
            }
            Command::ActiveMonitors { reply } => {
                let _ = reply.send(self.monitors.active_kinds());
            }
            Command::Shutdown { .. } => {},
            Command::StartupGraceElapsed => {
                self.startup_timer = None;
                if self.state == SessionState::Idle {
                    self.transition(SessionState::Sleeping).await;
                }
            }
            Command::AcknowledgmentElapsed { generation } => {
                if generation == self.ack_generation && self.display == DisplayState::Acknowledged {
                    self.set_display(self.state.into());
                }
            }
            Command::HandshakeFinished { epoch, result } => {
                self.on_handshake(epoch, result).await;
            }
            Command::Transport { epoch, event } => {
                if self.current_epoch() == Some(epoch) {
                    self.on_transport(event).await;
                } else if let TransportEvent::ToolCall { request, reply } = event {
                    tracing::debug!(tool = %request.tool_name, "Tool call for an ended session");
                    let _ = reply.send(ToolCallResult::error("session has ended"));
                }
            }
            Command::Context { epoch, update } => self.propose_context(epoch, update),
            Command::Wake { generation, event } => {
                if self.monitors.is_current(MonitorKind::Wake, generation) {
                    self.on_wake(event).await;
                }
            }
            Command::VoiceActivity { generation, event } => {
                if self.monitors.is_current(MonitorKind::VoiceActivity, generation) {
                    self.on_voice_activity(event).await;
                }
            }
            Command::BargeIn { generation, event } => {
                if self.monitors.is_current(MonitorKind::BargeIn, generation) {
                    self.on_barge_in(event).await;
                }
            }
        }
    }

    // ---- session lifecycle ----

    async fn open_session(&mut self, trigger: &'static str, reply: Option<StartReply>) {
        if let Some(active) = &self.session {
            tracing::debug!(session_id = %active.id(), "Conversation already open");
            if let Some(reply) = reply {
                let _ = reply.send(Ok(StartOutcome::AlreadyOpen(active.id().clone())));
            }
            return;
        }

        let session_id = SessionId::generate();
        self.epoch += 1;
        let epoch = self.epoch;
        tracing::info!(session_id = %session_id, trigger, "Opening conversation");
        if self.metrics_enabled {
            metrics::counter!("voice_orchestrator_sessions_opened_total").increment(1);
        }

        self.session = Some(ActiveSession {
            session: ConversationSession::new(session_id.clone()),
            epoch,
            handle: None,
            ever_connected: false,
            transcript: Vec::new(),
        });
        self.pending_start = reply;
        self.throttle.reset();
        self.history.event(
            &session_id,
            SessionLogKind::SessionStarted,
            json!({ "trigger": trigger }),
        );
        self.emit(OrchestratorEvent::SessionStarted {
            session_id: session_id.clone(),
        });

        if trigger == "wake_phrase" && self.settings.cue_enabled {
            if let Some(cue) = self.cue.clone() {
                tokio::spawn(async move {
                    if let Err(e) = cue.play().await {
                        tracing::warn!(error = %e, "Acknowledgment cue failed");
                    }
                });
            }
        }

        // Transport callbacks arrive on their own channel and are forwarded
        // into the mailbox tagged with this session's epoch.
        let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            while let Some(event) = transport_rx.recv().await {
                if mailbox.send(Command::Transport { epoch, event }).is_err() {
                    break;
                }
            }
        });

        let mut config = SessionConfig::new(session_id);
        config.agent_id = self.settings.agent_id.clone();
        config.tools = self.registry.list_tools();

        let transport = self.transport.clone();
        let mailbox = self.mailbox.clone();
        let limit_ms = self.settings.handshake_timeout_ms;
        tokio::spawn(async move {
            let open = AssertUnwindSafe(transport.open(config, transport_tx)).catch_unwind();
            let result = match tokio::time::timeout(Duration::from_millis(limit_ms), open).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(TransportError::Handshake(
                    "transport panicked during handshake".to_string(),
                )),
                Err(_) => Err(TransportError::Timeout(limit_ms)),
            };
            let _ = mailbox.send(Command::HandshakeFinished { epoch, result });
        });

        self.transition(SessionState::Listening).await;
    }

    async fn on_handshake(
        &mut self,
        epoch: u64,
        result: Result<Arc<dyn TransportHandle>, TransportError>,
    ) {
        if self.current_epoch() != Some(epoch) {
            if let Ok(handle) = result {
                tracing::info!("Handshake finished for an ended session, closing it");
                let limit = self.close_timeout();
                tokio::spawn(async move {
                    bounded(limit, "close", handle.close()).await;
                });
            }
            return;
        }

        match result {
            Ok(handle) => {
                let Some(active) = self.session.as_mut() else {
                    return;
                };
                active.handle = Some(handle);
                tracing::info!(session_id = %active.id(), "Transport handshake complete");
                let outcome = StartOutcome::Opened(active.id().clone());
                if let Some(reply) = self.pending_start.take() {
                    let _ = reply.send(Ok(outcome));
                }
                self.reconcile().await;
                self.start_context_feed();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transport handshake failed");
                if self.metrics_enabled {
                    metrics::counter!("voice_orchestrator_connection_failures_total")
                        .increment(1);
                }
                self.notice(Notice::ConnectionFailed {
                    reason: e.to_string(),
                });
                if let Some(reply) = self.pending_start.take() {
                    let _ = reply.send(Err(OrchestratorError::ConnectionFailed(e)));
                }
                self.end_conversation("connection failed").await;
            }
        }
    }

    /// Tear down the open session and go back to `Sleeping`
    async fn end_conversation(&mut self, reason: &str) {
        self.teardown(reason).await;
        self.transition(SessionState::Sleeping).await;
    }

    /// Unconditional cleanup: every step runs whatever state we are in
    async fn teardown(&mut self, reason: &str) {
        if let Some(reply) = self.pending_start.take() {
            let _ = reply.send(Err(OrchestratorError::ConnectionFailed(
                TransportError::ConnectionLost(reason.to_string()),
            )));
        }

        self.monitors.stop_all().await;
        if let Some(feed) = &self.context_feed {
            feed.stop().await;
        }

        if let Some(active) = self.session.take() {
            if let Some(handle) = &active.handle {
                bounded(self.close_timeout(), "close", handle.close()).await;
            }
            tracing::info!(
                session_id = %active.id(),
                reason,
                messages = active.transcript.len(),
                "Conversation ended"
            );
            self.history.event(
                active.id(),
                SessionLogKind::SessionEnded,
                json!({ "reason": reason, "messages": active.transcript.len() }),
            );
            self.history.end_session(active.id());
            self.emit(OrchestratorEvent::SessionEnded {
                session_id: active.session.session_id,
                reason: reason.to_string(),
            });
        }

        self.pair.clear();
        self.speaking_tx.send_replace(false);
        self.amplitude_tx.send_replace(0.0);
    }

    async fn shutdown(&mut self) {
        if let Some(timer) = self.startup_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.ack_timer.take() {
            timer.abort();
        }
        self.teardown("orchestrator shut down").await;
        self.transition(SessionState::Idle).await;
        self.publish();
        self.history.flush().await;
    }

    fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), OrchestratorError> {
        if self.session.is_some() {
            return Err(OrchestratorError::SessionOpen);
        }
        Arc::make_mut(&mut self.registry).register_arc(tool)?;
        Ok(())
    }

    // ---- transitions ----

    async fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from != to {
            self.state = to;
            tracing::info!(
                from = from.as_str(),
                to = to.as_str(),
                session_id = self.session.as_ref().map(|s| s.id().as_str()),
                "State transition"
            );
            if let Some(active) = &self.session {
                self.history.event(
                    active.id(),
                    SessionLogKind::StateChanged,
                    json!({ "from": from.as_str(), "to": to.as_str() }),
                );
            }
            self.emit(OrchestratorEvent::StateChanged { from, to });
        }
        self.set_display(to.into());
        self.reconcile().await;
    }

    /// Stop unwanted monitors, then start missing ones
    async fn reconcile(&mut self) {
        let handle = self.session.as_ref().and_then(|s| s.handle.clone());
        let wanted = Wanted::for_state(self.state, self.session.is_some(), handle.is_some());

        for kind in MonitorKind::ALL {
            if !wanted.contains(kind) && self.monitors.is_engaged(kind) {
                self.monitors.stop(kind).await;
            }
        }
        for kind in MonitorKind::ALL {
            if wanted.contains(kind) && !self.monitors.is_engaged(kind) {
                self.start_monitor(kind, handle.clone());
            }
        }
    }

    fn start_monitor(&mut self, kind: MonitorKind, handle: Option<Arc<dyn TransportHandle>>) {
        let mailbox = self.mailbox.clone();
        let started = match kind {
            MonitorKind::Wake => self.monitors.start_wake(|generation| {
                let sink: EventSink<WakeEvent> = Arc::new(move |event: WakeEvent| {
                    let _ = mailbox.send(Command::Wake { generation, event });
                });
                sink
            }),
            MonitorKind::VoiceActivity => self.monitors.start_voice_activity(|generation| {
                let sink: EventSink<VadEvent> = Arc::new(move |event: VadEvent| {
                    let _ = mailbox.send(Command::VoiceActivity { generation, event });
                });
                sink
            }),
            MonitorKind::BargeIn => self.monitors.start_barge_in(|generation| {
                let sink: EventSink<BargeInEvent> = Arc::new(move |event: BargeInEvent| {
                    let _ = mailbox.send(Command::BargeIn { generation, event });
                });
                sink
            }),
            MonitorKind::Amplitude => {
                let Some(handle) = handle else {
                    return;
                };
                let amplitude = self.amplitude_tx.clone();
                let sink: EventSink<f32> = Arc::new(move |level: f32| {
                    amplitude.send_replace(level);
                });
                self.monitors
                    .start_amplitude(handle, self.speaking_tx.subscribe(), sink)
            }
        };
        tracing::debug!(monitor = kind.as_str(), started, "Monitor engaged");
    }

    fn set_display(&mut self, display: DisplayState) {
        self.ack_generation += 1;
        if let Some(timer) = self.ack_timer.take() {
            timer.abort();
        }
        if self.display != display {
            self.display = display;
            self.emit(OrchestratorEvent::DisplayChanged(display));
        }
    }

    /// User turn is over: move to `Processing` and flash `Acknowledged`
    async fn user_turn_ended(&mut self) {
        self.transition(SessionState::Processing).await;

        self.set_display(DisplayState::Acknowledged);
        let generation = self.ack_generation;
        let delay = Duration::from_millis(self.settings.acknowledgment_ms);
        self.ack_timer = Some(self.schedule(delay, Command::AcknowledgmentElapsed { generation }));
    }

    // ---- inbound events ----

    async fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                let Some(active) = self.session.as_mut() else {
                    return;
                };
                active.session.status = ConnectionStatus::Connected;
                active.ever_connected = true;
                let session_id = active.id().clone();
                tracing::info!(session_id = %session_id, "Conversation connected");
                self.history
                    .event(&session_id, SessionLogKind::Connected, Value::Null);
                self.emit(OrchestratorEvent::Connected {
                    session_id: session_id.clone(),
                });
                self.start_context_feed();
            }
            TransportEvent::Disconnected { reason } => {
                self.on_transport_lost(TransportError::ConnectionLost(reason))
                    .await;
            }
            TransportEvent::Error { reason } => {
                self.on_transport_lost(TransportError::ConnectionLost(reason))
                    .await;
            }
            TransportEvent::Message { source, text } => self.ingest(source, &text).await,
            TransportEvent::SpeakingChanged(speaking) => self.on_speaking_changed(speaking).await,
            TransportEvent::TurnEnded => {
                if self.state == SessionState::Listening {
                    self.user_turn_ended().await;
                }
            }
            TransportEvent::ToolCall { request, reply } => self.dispatch_tool(request, reply),
        }
    }

    async fn on_transport_lost(&mut self, error: TransportError) {
        let Some(active) = self.session.as_mut() else {
            return;
        };
        active.session.status = ConnectionStatus::Disconnected;
        tracing::warn!(session_id = %active.id(), error = %error, "Transport lost");

        if !active.ever_connected {
            if self.metrics_enabled {
                metrics::counter!("voice_orchestrator_connection_failures_total").increment(1);
            }
            self.notice(Notice::ConnectionFailed {
                reason: error.to_string(),
            });
            if let Some(reply) = self.pending_start.take() {
                let _ = reply.send(Err(OrchestratorError::ConnectionFailed(error.clone())));
            }
        }
        self.end_conversation(&error.to_string()).await;
    }

    async fn ingest(&mut self, source: MessageSource, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(active) = self.session.as_mut() else {
            return;
        };
        let session_id = active.id().clone();
        active
            .transcript
            .push(TranscriptEntry::new(session_id.clone(), source, text));
        self.pair.record(source, text);
        self.history.message(&session_id, source, text);
        self.emit(OrchestratorEvent::Transcript {
            session_id,
            source,
            text: text.to_string(),
        });

        if source == MessageSource::User && self.state == SessionState::Listening {
            self.user_turn_ended().await;
        }
    }

    async fn on_speaking_changed(&mut self, speaking: bool) {
        if let Some(active) = self.session.as_mut() {
            active.session.is_agent_speaking = speaking;
        }
        self.speaking_tx.send_replace(speaking);

        match (speaking, self.state) {
            (true, SessionState::Listening | SessionState::Processing) => {
                self.transition(SessionState::Speaking).await;
            }
            (false, SessionState::Speaking) => {
                self.transition(SessionState::Listening).await;
            }
            _ => {},
        }
    }

    async fn on_wake(&mut self, event: WakeEvent) {
        match event {
            WakeEvent::PhraseHeard { phrase, .. } => {
                if self.state == SessionState::Sleeping {
                    tracing::info!(phrase = %phrase, "Waking up");
                    self.open_session("wake_phrase", None).await;
                }
            }
            WakeEvent::Degraded {
                consecutive_failures,
                reason,
            } => {
                tracing::warn!(consecutive_failures, reason = %reason, "Wake listener degraded");
                self.notice(Notice::Degraded {
                    component: MonitorKind::Wake.as_str().to_string(),
                    reason,
                });
            }
        }
    }

    async fn on_voice_activity(&mut self, event: VadEvent) {
        match event {
            VadEvent::SilenceReached {
                speech_ms,
                silence_ms,
            } => {
                if self.state == SessionState::Listening {
                    tracing::debug!(speech_ms, silence_ms, "Silence reached");
                    self.user_turn_ended().await;
                }
            }
            VadEvent::Failed(e) => {
                tracing::warn!(error = %e, "Voice activity monitor failed");
                self.notice(Notice::Degraded {
                    component: MonitorKind::VoiceActivity.as_str().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn on_barge_in(&mut self, event: BargeInEvent) {
        match event {
            BargeInEvent::Interrupt { speech_ms } => {
                if self.state != SessionState::Speaking {
                    return;
                }
                let Some(active) = self.session.as_mut() else {
                    return;
                };
                active.session.is_agent_speaking = false;
                let session_id = active.id().clone();
                let handle = active.handle.clone();

                tracing::info!(session_id = %session_id, speech_ms, "Barge-in, interrupting agent");
                if self.metrics_enabled {
                    metrics::counter!("voice_orchestrator_barge_ins_total").increment(1);
                }
                if let Some(handle) = handle {
                    if let Some(Err(e)) =
                        bounded(self.close_timeout(), "interrupt", handle.interrupt()).await
                    {
                        tracing::warn!(error = %e, "Failed to interrupt agent turn");
                    }
                }
                self.speaking_tx.send_replace(false);
                self.history.event(
                    &session_id,
                    SessionLogKind::BargeIn,
                    json!({ "speech_ms": speech_ms }),
                );
                self.emit(OrchestratorEvent::BargeIn { session_id });
                self.transition(SessionState::Listening).await;
            }
            BargeInEvent::Failed(e) => {
                tracing::warn!(error = %e, "Barge-in monitor failed");
                self.notice(Notice::Degraded {
                    component: MonitorKind::BargeIn.as_str().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // ---- tools ----

    fn dispatch_tool(&self, request: ToolCallRequest, reply: oneshot::Sender<ToolCallResult>) {
        let Some(active) = &self.session else {
            let _ = reply.send(ToolCallResult::error("no open session"));
            return;
        };
        let session_id = active.id().clone();
        let registry = self.registry.clone();
        let history = self.history.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let tool = request.tool_name.clone();
            let call_id = request.call_id.clone();
            let parameters = Value::Object(request.parameters.clone());

            let result = registry.dispatch(request).await;
            tracing::info!(
                session_id = %session_id,
                tool = %tool,
                is_error = result.is_error(),
                "Tool call finished"
            );
            history.event(
                &session_id,
                SessionLogKind::ToolCall,
                json!({
                    "tool": tool,
                    "call_id": call_id,
                    "parameters": parameters,
                    "result": result.as_str(),
                }),
            );
            let _ = events.send(OrchestratorEvent::ToolCompleted {
                session_id,
                tool,
                result: result.as_str().to_string(),
            });
            if reply.send(result).is_err() {
                tracing::debug!("Transport dropped the tool reply");
            }
        });
    }

    // ---- context ----

    /// Subscribe once the session is both connected and has its handle
    fn start_context_feed(&self) {
        let Some(feed) = &self.context_feed else {
            return;
        };
        let Some(epoch) = self
            .session
            .as_ref()
            .filter(|s| s.session.is_connected() && s.handle.is_some())
            .map(|s| s.epoch)
        else {
            return;
        };
        let mailbox = self.mailbox.clone();
        let sink: EventSink<ContextUpdate> = Arc::new(move |update: ContextUpdate| {
            let _ = mailbox.send(Command::Context { epoch, update });
        });
        feed.start(sink);
    }

    fn propose_context(&mut self, epoch: u64, update: ContextUpdate) {
        let connected = self
            .session
            .as_ref()
            .filter(|s| s.epoch == epoch && s.session.is_connected())
            .and_then(|s| s.handle.clone().map(|h| (s.id().clone(), h)));
        let Some((session_id, handle)) = connected else {
            self.context_dropped("not_connected");
            return;
        };
        if !self.throttle.admit(update.emitted_at) {
            tracing::debug!(kind = update.kind.as_str(), "Context update throttled");
            self.context_dropped("throttled");
            return;
        }

        let history = self.history.clone();
        let events = self.events_tx.clone();
        let metrics_enabled = self.metrics_enabled;
        tokio::spawn(async move {
            match handle.send_context_update(&update.payload).await {
                Ok(()) => {
                    if metrics_enabled {
                        metrics::counter!("voice_orchestrator_context_updates_sent_total")
                            .increment(1);
                    }
                    history.event(
                        &session_id,
                        SessionLogKind::ContextSent,
                        json!({ "kind": update.kind.as_str(), "payload": update.payload }),
                    );
                    let _ = events.send(OrchestratorEvent::ContextSent {
                        session_id,
                        kind: update.kind,
                    });
                }
                Err(e) => {
                    if metrics_enabled {
                        metrics::counter!(
                            "voice_orchestrator_context_updates_dropped_total",
                            "reason" => "send_failed"
                        )
                        .increment(1);
                    }
                    tracing::warn!(session_id = %session_id, error = %e, "Context update not delivered");
                }
            }
        });
    }

    fn context_dropped(&self, reason: &'static str) {
        if self.metrics_enabled {
            metrics::counter!(
                "voice_orchestrator_context_updates_dropped_total",
                "reason" => reason
            )
            .increment(1);
        }
    }

    // ---- helpers ----

    fn current_epoch(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.epoch)
    }

    fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.transport_close_timeout_ms)
    }

    fn schedule(&self, delay: Duration, command: Command) -> JoinHandle<()> {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = mailbox.send(command);
        })
    }

    fn notice(&self, notice: Notice) {
        tracing::warn!(notice = ?notice, "{}", notice.message());
        if let Some(active) = &self.session {
            self.history.event(
                active.id(),
                SessionLogKind::Notice,
                serde_json::to_value(&notice).unwrap_or(Value::Null),
            );
        }
        self.emit(OrchestratorEvent::Notice(notice));
    }

    fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        let active = self.session.as_ref();
        let next = OrchestratorSnapshot {
            state: self.state,
            display_state: self.display,
            session_id: active.map(|s| s.id().clone()),
            connection: active.map(|s| s.session.status),
            last_user_text: self.pair.last_user_text.clone(),
            last_agent_text: self.pair.last_agent_text.clone(),
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Transport call with a deadline; a panicking transport is treated like a timeout
async fn bounded<F: Future>(limit: Duration, operation: &'static str, fut: F) -> Option<F::Output> {
    match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(_)) => {
            tracing::error!(operation, "Transport call panicked");
            None
        }
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "Transport call timed out"
            );
            None
        }
    }
}
