//! Scripted in-process collaborators for orchestrator tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use voice_orchestrator_agent::{
    Collaborators, MonitorKind, OrchestratorEvent, SessionOrchestrator,
};
use voice_orchestrator_config::Settings;
use voice_orchestrator_core::{
    AcknowledgmentCue, AgentTransport, AudioInput, ChangeEvent, ChangeFeed, ChangeStream,
    FeedFilter, LevelFrame, LevelSource, LevelStream, MonitorError, PersistenceError,
    RecognizerEvent, RecognizerStream, SessionConfig, SessionState, SpeechRecognizer,
    ToolCallRequest, ToolCallResult, TransportError, TransportEvent, TransportEventSender,
    TransportHandle,
};
use voice_orchestrator_persistence::{InMemoryConversationStore, InMemoryEventLog};
use voice_orchestrator_tools::{
    create_household_registry, HouseholdIntegrations, InMemoryHousehold, InventoryItem,
    ToolRegistry,
};

// ---- transport ----

#[derive(Default)]
pub struct FakeHandle {
    pub closes: AtomicUsize,
    pub interrupts: AtomicUsize,
    pub context: Mutex<Vec<String>>,
    panicking: AtomicBool,
    rejecting_context: AtomicBool,
}

impl FakeHandle {
    /// Make `close` and `interrupt` panic after counting the call
    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Make `send_context_update` fail with a send error
    pub fn set_rejecting_context(&self, rejecting: bool) {
        self.rejecting_context.store(rejecting, Ordering::SeqCst);
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> Vec<String> {
        self.context.lock().clone()
    }
}

impl LevelSource for FakeHandle {
    fn input_level(&self) -> f32 {
        0.25
    }

    fn output_level(&self) -> f32 {
        0.75
    }
}

#[async_trait]
impl TransportHandle for FakeHandle {
    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("socket already torn down");
        }
    }

    async fn interrupt(&self) -> Result<(), TransportError> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("interrupt on a dead socket");
        }
        Ok(())
    }

    async fn send_context_update(&self, text: &str) -> Result<(), TransportError> {
        if self.rejecting_context.load(Ordering::SeqCst) {
            return Err(TransportError::Send("data channel closed".into()));
        }
        self.context.lock().push(text.to_string());
        Ok(())
    }
}

pub struct FakeTransport {
    pub opened: Mutex<Vec<SessionConfig>>,
    pub handles: Mutex<Vec<Arc<FakeHandle>>>,
    senders: Mutex<Vec<TransportEventSender>>,
    fail_next: Mutex<Option<TransportError>>,
    handshake_delay: Mutex<Duration>,
    auto_connect: AtomicBool,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            handshake_delay: Mutex::new(Duration::ZERO),
            auto_connect: AtomicBool::new(true),
        }
    }
}

impl FakeTransport {
    pub fn fail_next(&self, error: TransportError) {
        *self.fail_next.lock() = Some(error);
    }

    pub fn set_handshake_delay(&self, delay: Duration) {
        *self.handshake_delay.lock() = delay;
    }

    pub fn set_auto_connect(&self, connect: bool) {
        self.auto_connect.store(connect, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub fn handle(&self) -> Arc<FakeHandle> {
        self.handles
            .lock()
            .last()
            .cloned()
            .expect("no transport handle opened")
    }

    /// Send an event on the most recent session's channel
    pub fn emit(&self, event: TransportEvent) {
        let senders = self.senders.lock();
        let sender = senders.last().expect("no transport session opened");
        sender.send(event).expect("orchestrator dropped transport events");
    }

    pub async fn call_tool(&self, name: &str, parameters: Value) -> ToolCallResult {
        let (reply, rx) = oneshot::channel();
        self.emit(TransportEvent::ToolCall {
            request: ToolCallRequest::new(name, parameters),
            reply,
        });
        rx.await.expect("tool call was never answered")
    }
}

#[async_trait]
impl AgentTransport for FakeTransport {
    async fn open(
        &self,
        config: SessionConfig,
        events: TransportEventSender,
    ) -> Result<Arc<dyn TransportHandle>, TransportError> {
        self.opened.lock().push(config);
        let delay = *self.handshake_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.fail_next.lock().take() {
            return Err(error);
        }

        if self.auto_connect.load(Ordering::SeqCst) {
            let _ = events.send(TransportEvent::Connected);
        }
        self.senders.lock().push(events);
        let handle = Arc::new(FakeHandle::default());
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

// ---- speech ----

#[derive(Default)]
pub struct FakeRecognizer {
    current: Mutex<Option<mpsc::UnboundedSender<RecognizerEvent>>>,
    starts: AtomicUsize,
    failing: AtomicBool,
}

impl FakeRecognizer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn is_listening(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Deliver a final transcript to the running loop
    pub fn say(&self, text: &str) -> bool {
        match self.current.lock().as_ref() {
            Some(tx) => tx
                .send(RecognizerEvent::Transcript {
                    text: text.to_string(),
                    is_final: true,
                })
                .is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start_listening(&self) -> Result<RecognizerStream, MonitorError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MonitorError::RecognizerUnavailable("no engine".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.current.lock() = Some(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn stop_listening(&self) {
        self.current.lock().take();
    }
}

// ---- audio ----

const FRAME_MS: u32 = 20;

#[derive(Default)]
pub struct FakeAudio {
    current: Mutex<Option<mpsc::UnboundedSender<Result<LevelFrame, MonitorError>>>>,
    opens: AtomicUsize,
}

impl FakeAudio {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn push(&self, rms: f32, total_ms: u32) {
        let current = self.current.lock();
        let Some(tx) = current.as_ref() else {
            return;
        };
        for _ in 0..(total_ms / FRAME_MS) {
            let _ = tx.send(Ok(LevelFrame::new(rms, FRAME_MS)));
        }
    }

    pub fn speak(&self, ms: u32) {
        self.push(0.5, ms);
    }

    pub fn silence(&self, ms: u32) {
        self.push(0.0, ms);
    }
}

#[async_trait]
impl AudioInput for FakeAudio {
    async fn open(&self) -> Result<LevelStream, MonitorError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.current.lock() = Some(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

// ---- cue and change feed ----

#[derive(Default)]
pub struct FakeCue {
    plays: AtomicUsize,
}

impl FakeCue {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AcknowledgmentCue for FakeCue {
    async fn play(&self) -> Result<(), MonitorError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFeed {
    current: Mutex<Option<mpsc::UnboundedSender<ChangeEvent>>>,
    snapshot: Mutex<Option<String>>,
}

impl FakeFeed {
    pub fn with_snapshot(snapshot: &str) -> Self {
        Self {
            current: Mutex::new(None),
            snapshot: Mutex::new(Some(snapshot.to_string())),
        }
    }

    pub fn push(&self, change: ChangeEvent) -> bool {
        match self.current.lock().as_ref() {
            Some(tx) => tx.send(change).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl ChangeFeed for FakeFeed {
    async fn subscribe(&self, _filter: FeedFilter) -> Result<ChangeStream, PersistenceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.current.lock() = Some(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn snapshot(&self, _filter: &FeedFilter) -> Result<Option<String>, PersistenceError> {
        Ok(self.snapshot.lock().clone())
    }
}

// ---- harness ----

pub struct Harness {
    pub orchestrator: SessionOrchestrator,
    pub events: broadcast::Receiver<OrchestratorEvent>,
    pub transport: Arc<FakeTransport>,
    pub recognizer: Arc<FakeRecognizer>,
    pub audio: Arc<FakeAudio>,
    pub cue: Arc<FakeCue>,
    pub feed: Arc<FakeFeed>,
    pub conversations: Arc<InMemoryConversationStore>,
    pub log: Arc<InMemoryEventLog>,
    pub household: Arc<InMemoryHousehold>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let transport = Arc::new(FakeTransport::default());
        let recognizer = Arc::new(FakeRecognizer::default());
        let audio = Arc::new(FakeAudio::default());
        let cue = Arc::new(FakeCue::default());
        let feed = Arc::new(FakeFeed::with_snapshot("Pantry: rice, lentils. Fridge: milk."));
        let conversations = Arc::new(InMemoryConversationStore::new());
        let log = Arc::new(InMemoryEventLog::new());
        let household = Arc::new(InMemoryHousehold::new().with_items([
            InventoryItem::new("milk", 1.0, "l", "fridge"),
            InventoryItem::new("rice", 2.0, "kg", "pantry"),
        ]));

        let collaborators = Collaborators::new(transport.clone(), recognizer.clone(), audio.clone())
            .with_cue(cue.clone())
            .with_change_feed(feed.clone())
            .with_stores(conversations.clone(), log.clone());
        let registry: ToolRegistry = create_household_registry(
            &HouseholdIntegrations::in_memory(household.clone()),
            &settings.tools,
        )
        .expect("household registry");

        let orchestrator = SessionOrchestrator::spawn(&settings, collaborators, registry);
        let events = orchestrator.subscribe();

        Self {
            orchestrator,
            events,
            transport,
            recognizer,
            audio,
            cue,
            feed,
            conversations,
            log,
            household,
        }
    }

    /// Let every spawned task run until it blocks
    pub async fn settle(&self) {
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Wait out the startup grace delay
    pub async fn until_sleeping(&self) {
        tokio::time::sleep(Duration::from_millis(1600)).await;
        self.settle().await;
        assert_eq!(self.orchestrator.state(), SessionState::Sleeping);
    }

    /// Sleeping, then the wake phrase: a connected session in `Listening`
    pub async fn wake(&self) {
        self.until_sleeping().await;
        assert!(self.recognizer.say("hey hearth, are you there?"));
        self.settle().await;
        assert_eq!(self.orchestrator.state(), SessionState::Listening);
    }

    /// User speaks, then stays quiet long enough to end the turn
    pub async fn finish_user_turn(&self) {
        self.audio.speak(600);
        self.audio.silence(2000);
        self.settle().await;
    }

    pub async fn active(&self) -> Vec<MonitorKind> {
        self.orchestrator
            .active_monitors()
            .await
            .expect("orchestrator running")
    }

    /// Wake listener only while sleeping; session monitors only with a session
    pub async fn assert_monitor_invariants(&self) {
        let active = self.active().await;
        let snapshot = self.orchestrator.snapshot();
        if snapshot.state != SessionState::Sleeping {
            assert!(
                !active.contains(&MonitorKind::Wake),
                "wake listener active in {:?}",
                snapshot.state
            );
        }
        if !snapshot.has_session() {
            for kind in [
                MonitorKind::VoiceActivity,
                MonitorKind::BargeIn,
                MonitorKind::Amplitude,
            ] {
                assert!(!active.contains(&kind), "{:?} active without a session", kind);
            }
        }
    }

    /// Drain events received so far
    pub fn drain_events(&mut self) -> Vec<OrchestratorEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}
