//! Voice activity monitor
//!
//! Watches microphone energy while the user holds the turn and raises a
//! single event once enough trailing silence follows speech.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use voice_orchestrator_config::VadSettings;
use voice_orchestrator_core::{AudioInput, LevelFrame, MonitorError};

use crate::{EventSink, Monitor, MonitorTask};

/// VAD configuration
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Normalized RMS level above which a frame is speech (0.0 - 1.0)
    pub energy_threshold: f32,
    /// Trailing silence that ends the turn (ms)
    pub silence_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self::from(&VadSettings::default())
    }
}

impl From<&VadSettings> for VadConfig {
    fn from(settings: &VadSettings) -> Self {
        Self {
            energy_threshold: settings.energy_threshold,
            silence_ms: settings.silence_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    /// The user stopped talking
    SilenceReached { speech_ms: u32, silence_ms: u32 },
    /// Microphone unavailable; the monitor has stopped
    Failed(MonitorError),
}

/// Frame-by-frame trailing-silence accounting
///
/// Silence only counts once speech has been heard, so a user who has not
/// started talking yet is never cut off.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    config: VadConfig,
    speech_ms: u32,
    silence_ms: u32,
}

impl SilenceDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            speech_ms: 0,
            silence_ms: 0,
        }
    }

    pub fn heard_speech(&self) -> bool {
        self.speech_ms > 0
    }

    /// Feed one frame; returns the event when the threshold is crossed
    pub fn process(&mut self, frame: &LevelFrame) -> Option<VadEvent> {
        if frame.rms >= self.config.energy_threshold {
            self.speech_ms = self.speech_ms.saturating_add(frame.duration_ms);
            self.silence_ms = 0;
            return None;
        }

        if !self.heard_speech() {
            return None;
        }

        self.silence_ms = self.silence_ms.saturating_add(frame.duration_ms);
        if self.silence_ms >= self.config.silence_ms {
            let event = VadEvent::SilenceReached {
                speech_ms: self.speech_ms,
                silence_ms: self.silence_ms,
            };
            self.reset();
            return Some(event);
        }
        None
    }

    pub fn reset(&mut self) {
        self.speech_ms = 0;
        self.silence_ms = 0;
    }
}

/// End-of-turn detection over the microphone level stream
pub struct VoiceActivityMonitor {
    audio: Arc<dyn AudioInput>,
    config: VadConfig,
    task: MonitorTask,
}

impl VoiceActivityMonitor {
    pub fn new(audio: Arc<dyn AudioInput>, config: VadConfig) -> Self {
        Self {
            audio,
            config,
            task: MonitorTask::new("voice_activity"),
        }
    }

    /// Start watching; the loop ends after the first event
    pub fn start(&self, on_event: EventSink<VadEvent>) -> bool {
        let audio = self.audio.clone();
        let detector = SilenceDetector::new(self.config.clone());
        self.task
            .spawn(move |cancel| watch(audio, detector, on_event, cancel))
    }
}

#[async_trait]
impl Monitor for VoiceActivityMonitor {
    fn name(&self) -> &'static str {
        self.task.name()
    }

    fn is_active(&self) -> bool {
        self.task.is_active()
    }

    async fn stop(&self) {
        self.task.stop().await;
    }
}

async fn watch(
    audio: Arc<dyn AudioInput>,
    mut detector: SilenceDetector,
    on_event: EventSink<VadEvent>,
    cancel: CancellationToken,
) {
    let mut frames = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = audio.open() => match opened {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "Voice activity monitor could not open input");
                on_event(VadEvent::Failed(e));
                return;
            }
        },
    };

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                if let Some(event) = detector.process(&frame) {
                    tracing::debug!(?event, "End of user turn detected");
                    on_event(event);
                    return;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Voice activity input failed");
                on_event(VadEvent::Failed(e));
                return;
            }
            None => {
                on_event(VadEvent::Failed(MonitorError::DeviceUnavailable(
                    "input level stream ended".to_string(),
                )));
                return;
            }
        }
    }
}
