//! Barge-in monitor
//!
//! Runs while the agent is speaking. Sustained local speech above the
//! energy threshold, after a short grace period from agent audio onset,
//! raises an interrupt.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use voice_orchestrator_config::BargeInSettings;
use voice_orchestrator_core::{AudioInput, LevelFrame, MonitorError};

use crate::{EventSink, Monitor, MonitorTask};

/// Barge-in detection configuration
#[derive(Debug, Clone)]
pub struct BargeInConfig {
    pub enabled: bool,
    /// Normalized RMS level of user speech (0.0 - 1.0)
    pub energy_threshold: f32,
    /// Minimum continuous speech to trigger an interrupt (ms)
    pub min_speech_ms: u32,
    /// Ignore speech this long after agent audio starts (ms)
    pub grace_period_ms: u32,
}

impl Default for BargeInConfig {
    fn default() -> Self {
        Self::from(&BargeInSettings::default())
    }
}

impl From<&BargeInSettings> for BargeInConfig {
    fn from(settings: &BargeInSettings) -> Self {
        Self {
            enabled: settings.enabled,
            energy_threshold: settings.energy_threshold,
            min_speech_ms: settings.min_speech_ms,
            grace_period_ms: settings.grace_period_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BargeInEvent {
    /// The user started talking over the agent
    Interrupt { speech_ms: u32 },
    /// Microphone unavailable; the monitor has stopped
    Failed(MonitorError),
}

/// Speech-onset accounting over level frames
#[derive(Debug, Clone)]
pub struct BargeInDetector {
    config: BargeInConfig,
    elapsed_ms: u32,
    speech_ms: u32,
}

impl BargeInDetector {
    pub fn new(config: BargeInConfig) -> Self {
        Self {
            config,
            elapsed_ms: 0,
            speech_ms: 0,
        }
    }

    pub fn process(&mut self, frame: &LevelFrame) -> Option<BargeInEvent> {
        self.elapsed_ms = self.elapsed_ms.saturating_add(frame.duration_ms);

        // Agent audio leaking into the microphone right at onset
        if self.elapsed_ms <= self.config.grace_period_ms {
            return None;
        }

        if frame.rms >= self.config.energy_threshold {
            self.speech_ms = self.speech_ms.saturating_add(frame.duration_ms);
        } else {
            self.speech_ms = 0;
        }

        if self.speech_ms >= self.config.min_speech_ms {
            let speech_ms = self.speech_ms;
            self.speech_ms = 0;
            return Some(BargeInEvent::Interrupt { speech_ms });
        }
        None
    }
}

/// Interrupt detection over the microphone level stream
pub struct BargeInMonitor {
    audio: Arc<dyn AudioInput>,
    config: BargeInConfig,
    task: MonitorTask,
}

impl BargeInMonitor {
    pub fn new(audio: Arc<dyn AudioInput>, config: BargeInConfig) -> Self {
        Self {
            audio,
            config,
            task: MonitorTask::new("barge_in"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Start watching; disabled monitors never start
    pub fn start(&self, on_event: EventSink<BargeInEvent>) -> bool {
        if !self.config.enabled {
            return false;
        }
        let audio = self.audio.clone();
        let detector = BargeInDetector::new(self.config.clone());
        self.task
            .spawn(move |cancel| watch(audio, detector, on_event, cancel))
    }
}

#[async_trait]
impl Monitor for BargeInMonitor {
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
    mut detector: BargeInDetector,
    on_event: EventSink<BargeInEvent>,
    cancel: CancellationToken,
) {
    let mut frames = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = audio.open() => match opened {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "Barge-in monitor could not open input");
                on_event(BargeInEvent::Failed(e));
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
                    tracing::debug!(?event, "Barge-in detected");
                    on_event(event);
                    return;
                }
            }
            Some(Err(e)) => {
                on_event(BargeInEvent::Failed(e));
                return;
            }
            None => {
                on_event(BargeInEvent::Failed(MonitorError::DeviceUnavailable(
                    "input level stream ended".to_string(),
                )));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use voice_orchestrator_core::LevelStream;

    fn config() -> BargeInConfig {
        BargeInConfig {
            enabled: true,
            energy_threshold: 0.2,
            min_speech_ms: 150,
            grace_period_ms: 100,
        }
    }

    fn frame(rms: f32) -> LevelFrame {
        LevelFrame::new(rms, 50)
    }

    #[test]
    fn test_grace_period_ignores_onset() {
        let mut detector = BargeInDetector::new(config());
        assert_eq!(detector.process(&frame(0.9)), None);
        assert_eq!(detector.process(&frame(0.9)), None);
        // Grace over; speech accumulates from here
        assert_eq!(detector.process(&frame(0.9)), None);
        assert_eq!(detector.process(&frame(0.9)), None);
        assert_eq!(
            detector.process(&frame(0.9)),
            Some(BargeInEvent::Interrupt { speech_ms: 150 })
        );
    }

    #[test]
    fn test_short_bursts_do_not_interrupt() {
        let mut detector = BargeInDetector::new(BargeInConfig {
            grace_period_ms: 0,
            ..config()
        });
        for _ in 0..10 {
            assert_eq!(detector.process(&frame(0.9)), None);
            assert_eq!(detector.process(&frame(0.9)), None);
            assert_eq!(detector.process(&frame(0.05)), None);
        }
    }

    struct SteadyInput(f32);

    #[async_trait]
    impl AudioInput for SteadyInput {
        async fn open(&self) -> Result<LevelStream, MonitorError> {
            let level = self.0;
            Ok(Box::pin(futures::stream::repeat_with(move || {
                Ok::<_, MonitorError>(LevelFrame::new(level, 50))
            })))
        }
    }

    #[tokio::test]
    async fn test_disabled_monitor_never_starts() {
        let monitor = BargeInMonitor::new(
            Arc::new(SteadyInput(1.0)),
            BargeInConfig {
                enabled: false,
                ..config()
            },
        );
        assert!(!monitor.start(Arc::new(|_: BargeInEvent| {})));
        assert!(!monitor.is_active());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_loud_input_interrupts() {
        let monitor = BargeInMonitor::new(Arc::new(SteadyInput(0.8)), config());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();

        monitor.start(Arc::new(move |e: BargeInEvent| sink_events.lock().push(e)));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(
            events.lock().as_slice(),
            &[BargeInEvent::Interrupt { speech_ms: 150 }]
        );
        assert!(!monitor.is_active());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_quiet_input_keeps_running_until_stopped() {
        let monitor = BargeInMonitor::new(Arc::new(QuietInput), config());
        monitor.start(Arc::new(|_: BargeInEvent| panic!("no event expected")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(monitor.is_active());
        monitor.stop().await;
        assert!(!monitor.is_active());
    }

    struct QuietInput;

    #[async_trait]
    impl AudioInput for QuietInput {
        async fn open(&self) -> Result<LevelStream, MonitorError> {
            let frames = futures::stream::iter(vec![Ok::<_, MonitorError>(LevelFrame::new(0.0, 50)); 4]);
            Ok(Box::pin(frames.chain(futures::stream::pending())))
        }
    }
}
