//! Monitor lifecycle owned by the orchestrator
//!
//! Which monitors run is a pure function of the session state (see
//! [`Wanted::for_state`]). After every transition the orchestrator stops what
//! is no longer wanted, then starts what is missing, so a device is released
//! before the next monitor opens it.
//!
//! Each start and stop bumps the monitor's generation. Events carry the
//! generation they were produced under, and anything from an older one is
//! discarded.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use voice_orchestrator_core::{LevelSource, SessionState, TransportHandle};
use voice_orchestrator_pipeline::{
    AmplitudeSampler, BargeInEvent, BargeInMonitor, EventSink, Monitor, VadEvent,
    VoiceActivityMonitor, WakeEvent, WakePhraseListener,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorKind {
    Wake,
    VoiceActivity,
    BargeIn,
    Amplitude,
}

impl MonitorKind {
    pub const ALL: [MonitorKind; 4] = [
        MonitorKind::Wake,
        MonitorKind::VoiceActivity,
        MonitorKind::BargeIn,
        MonitorKind::Amplitude,
    ];

    fn index(self) -> usize {
        match self {
            Self::Wake => 0,
            Self::VoiceActivity => 1,
            Self::BargeIn => 2,
            Self::Amplitude => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wake => "wake_phrase",
            Self::VoiceActivity => "voice_activity",
            Self::BargeIn => "barge_in",
            Self::Amplitude => "amplitude",
        }
    }
}

/// Monitors that should be running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wanted {
    pub wake: bool,
    pub voice_activity: bool,
    pub barge_in: bool,
    pub amplitude: bool,
}

impl Wanted {
    /// `session_live` means a session exists; `handle_ready` that its
    /// handshake completed
    pub fn for_state(state: SessionState, session_live: bool, handle_ready: bool) -> Self {
        Self {
            wake: state == SessionState::Sleeping,
            voice_activity: session_live && state == SessionState::Listening,
            barge_in: session_live && state == SessionState::Speaking,
            amplitude: handle_ready && state.is_conversational(),
        }
    }

    pub fn contains(&self, kind: MonitorKind) -> bool {
        match kind {
            MonitorKind::Wake => self.wake,
            MonitorKind::VoiceActivity => self.voice_activity,
            MonitorKind::BargeIn => self.barge_in,
            MonitorKind::Amplitude => self.amplitude,
        }
    }
}

/// Level probe over the open transport handle
struct HandleLevels(Arc<dyn TransportHandle>);

impl LevelSource for HandleLevels {
    fn input_level(&self) -> f32 {
        self.0.input_level()
    }

    fn output_level(&self) -> f32 {
        self.0.output_level()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    engaged: bool,
    generation: u64,
}

pub struct MonitorSet {
    wake: WakePhraseListener,
    voice_activity: VoiceActivityMonitor,
    barge_in: BargeInMonitor,
    amplitude: AmplitudeSampler,
    slots: [Slot; 4],
}

impl MonitorSet {
    pub fn new(
        wake: WakePhraseListener,
        voice_activity: VoiceActivityMonitor,
        barge_in: BargeInMonitor,
        amplitude: AmplitudeSampler,
    ) -> Self {
        Self {
            wake,
            voice_activity,
            barge_in,
            amplitude,
            slots: [Slot::default(); 4],
        }
    }

    fn monitor(&self, kind: MonitorKind) -> &dyn Monitor {
        match kind {
            MonitorKind::Wake => &self.wake,
            MonitorKind::VoiceActivity => &self.voice_activity,
            MonitorKind::BargeIn => &self.barge_in,
            MonitorKind::Amplitude => &self.amplitude,
        }
    }

    /// Whether the orchestrator started this monitor for the current state
    ///
    /// Stays true after a one-shot loop finishes on its own, so a failed
    /// monitor is not restarted until the state changes.
    pub fn is_engaged(&self, kind: MonitorKind) -> bool {
        self.slots[kind.index()].engaged
    }

    /// Whether the monitor's loop is actually running
    pub fn is_active(&self, kind: MonitorKind) -> bool {
        self.monitor(kind).is_active()
    }

    pub fn active_kinds(&self) -> Vec<MonitorKind> {
        MonitorKind::ALL
            .into_iter()
            .filter(|kind| self.is_active(*kind))
            .collect()
    }

    pub fn is_current(&self, kind: MonitorKind, generation: u64) -> bool {
        self.slots[kind.index()].generation == generation
    }

    fn engage(&mut self, kind: MonitorKind) -> u64 {
        let slot = &mut self.slots[kind.index()];
        slot.generation += 1;
        slot.engaged = true;
        slot.generation
    }

    pub fn start_wake(&mut self, sink: impl FnOnce(u64) -> EventSink<WakeEvent>) -> bool {
        let generation = self.engage(MonitorKind::Wake);
        self.wake.start(sink(generation))
    }

    pub fn start_voice_activity(&mut self, sink: impl FnOnce(u64) -> EventSink<VadEvent>) -> bool {
        let generation = self.engage(MonitorKind::VoiceActivity);
        self.voice_activity.start(sink(generation))
    }

    pub fn start_barge_in(&mut self, sink: impl FnOnce(u64) -> EventSink<BargeInEvent>) -> bool {
        let generation = self.engage(MonitorKind::BargeIn);
        self.barge_in.start(sink(generation))
    }

    pub fn start_amplitude(
        &mut self,
        handle: Arc<dyn TransportHandle>,
        agent_speaking: watch::Receiver<bool>,
        sink: EventSink<f32>,
    ) -> bool {
        self.engage(MonitorKind::Amplitude);
        self.amplitude
            .start(Arc::new(HandleLevels(handle)), agent_speaking, sink)
    }

    /// Stop one monitor; a panicking stop is logged and swallowed
    pub async fn stop(&mut self, kind: MonitorKind) {
        let slot = &mut self.slots[kind.index()];
        slot.generation += 1;
        slot.engaged = false;

        let stopped = AssertUnwindSafe(self.monitor(kind).stop())
            .catch_unwind()
            .await;
        if stopped.is_err() {
            tracing::error!(monitor = kind.as_str(), "Monitor stop panicked");
        }
    }

    /// Stop every monitor, each independently of the others
    pub async fn stop_all(&mut self) {
        for kind in MonitorKind::ALL {
            self.stop(kind).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_only_while_sleeping() {
        for state in [
            SessionState::Idle,
            SessionState::Listening,
            SessionState::Processing,
            SessionState::Speaking,
        ] {
            assert!(!Wanted::for_state(state, true, true).wake);
            assert!(!Wanted::for_state(state, false, false).wake);
        }
        let sleeping = Wanted::for_state(SessionState::Sleeping, false, false);
        assert!(sleeping.wake);
        assert!(!sleeping.voice_activity && !sleeping.barge_in && !sleeping.amplitude);
    }

    #[test]
    fn test_session_monitors_need_a_session() {
        let listening = Wanted::for_state(SessionState::Listening, true, false);
        assert!(listening.voice_activity);
        assert!(!listening.amplitude, "no level source before the handshake");

        let speaking = Wanted::for_state(SessionState::Speaking, true, true);
        assert!(speaking.barge_in && speaking.amplitude);
        assert!(!speaking.voice_activity);

        let orphan = Wanted::for_state(SessionState::Listening, false, false);
        assert_eq!(orphan, Wanted::default());
    }

    #[test]
    fn test_processing_runs_no_audio_monitors() {
        let processing = Wanted::for_state(SessionState::Processing, true, true);
        assert!(!processing.voice_activity && !processing.barge_in);
        assert!(processing.amplitude);
    }
}
