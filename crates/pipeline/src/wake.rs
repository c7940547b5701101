//! Wake-phrase listener
//!
//! Runs a continuous recognition loop while the device sleeps. Platform
//! recognizers end their sessions on their own (timeouts, audio focus loss);
//! the listener restarts them without the orchestrator being involved,
//! backing off exponentially while they keep failing.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use voice_orchestrator_config::WakeSettings;
use voice_orchestrator_core::{MonitorError, RecognizerEvent, SpeechRecognizer};

use crate::{EventSink, Monitor, MonitorTask};

/// Wake listener configuration
#[derive(Debug, Clone)]
pub struct WakeConfig {
    pub phrases: Vec<String>,
    /// Delay before a normal restart
    pub restart_delay: Duration,
    /// Cap on the backoff after repeated failures
    pub max_backoff: Duration,
    /// Consecutive failures before [`WakeEvent::Degraded`] is raised
    pub degraded_after: u32,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self::from(&WakeSettings::default())
    }
}

impl From<&WakeSettings> for WakeConfig {
    fn from(settings: &WakeSettings) -> Self {
        Self {
            phrases: settings.phrases.clone(),
            restart_delay: Duration::from_millis(settings.restart_delay_ms),
            max_backoff: Duration::from_millis(settings.max_restart_backoff_ms),
            degraded_after: settings.degraded_after_failures.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WakeEvent {
    /// A configured phrase was recognized; the loop ends after this
    PhraseHeard { phrase: String, transcript: String },
    /// Recognition keeps failing; the listener is still retrying
    Degraded { consecutive_failures: u32, reason: String },
}

/// Restart delay after `failures` consecutive failures
pub fn restart_backoff(base: Duration, max: Duration, failures: u32) -> Duration {
    let factor = 1u32.checked_shl(failures.min(16)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

/// Case- and punctuation-insensitive phrase matching on word boundaries
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrases: Vec<(String, String)>,
}

impl PhraseMatcher {
    pub fn new(phrases: &[String]) -> Self {
        let phrases = phrases
            .iter()
            .map(|p| (p.clone(), normalize(p)))
            .filter(|(_, n)| !n.is_empty())
            .collect();
        Self { phrases }
    }

    /// The configured phrase contained in `transcript`, if any
    pub fn find(&self, transcript: &str) -> Option<&str> {
        let padded = format!(" {} ", normalize(transcript));
        self.phrases
            .iter()
            .find(|(_, n)| padded.contains(&format!(" {} ", n)))
            .map(|(original, _)| original.as_str())
    }
}

fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

enum LoopOutcome {
    Heard { phrase: String, transcript: String },
    Ended { heard_speech: bool },
    Failed(MonitorError),
    Cancelled,
}

/// Continuous wake-phrase recognition
pub struct WakePhraseListener {
    recognizer: Arc<dyn SpeechRecognizer>,
    config: WakeConfig,
    task: MonitorTask,
}

impl WakePhraseListener {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, config: WakeConfig) -> Self {
        Self {
            recognizer,
            config,
            task: MonitorTask::new("wake_phrase"),
        }
    }

    pub fn config(&self) -> &WakeConfig {
        &self.config
    }

    /// Start listening; no-op while already active
    pub fn start(&self, on_event: EventSink<WakeEvent>) -> bool {
        let recognizer = self.recognizer.clone();
        let config = self.config.clone();
        self.task
            .spawn(move |cancel| listen(recognizer, config, on_event, cancel))
    }
}

#[async_trait]
impl Monitor for WakePhraseListener {
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

async fn listen(
    recognizer: Arc<dyn SpeechRecognizer>,
    config: WakeConfig,
    on_event: EventSink<WakeEvent>,
    cancel: CancellationToken,
) {
    let matcher = PhraseMatcher::new(&config.phrases);
    let mut failures: u32 = 0;

    loop {
        let outcome = recognize_once(recognizer.as_ref(), &matcher, &cancel).await;
        recognizer.stop_listening().await;

        let reason = match outcome {
            LoopOutcome::Heard { phrase, transcript } => {
                tracing::info!(phrase = %phrase, "Wake phrase heard");
                on_event(WakeEvent::PhraseHeard { phrase, transcript });
                return;
            }
            LoopOutcome::Cancelled => return,
            LoopOutcome::Ended { heard_speech: true } => {
                failures = 0;
                None
            }
            LoopOutcome::Ended { heard_speech: false } => {
                Some("recognition ended without a transcript".to_string())
            }
            LoopOutcome::Failed(e) => Some(e.to_string()),
        };

        if let Some(reason) = reason {
            failures = failures.saturating_add(1);
            tracing::warn!(
                recognizer = recognizer.name(),
                consecutive_failures = failures,
                reason = %reason,
                "Wake recognition loop failed"
            );
            if failures == config.degraded_after {
                on_event(WakeEvent::Degraded {
                    consecutive_failures: failures,
                    reason,
                });
            }
        }

        let delay = restart_backoff(config.restart_delay, config.max_backoff, failures);
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Restarting wake recognition");
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {},
        }
    }
}

async fn recognize_once(
    recognizer: &dyn SpeechRecognizer,
    matcher: &PhraseMatcher,
    cancel: &CancellationToken,
) -> LoopOutcome {
    let mut stream = tokio::select! {
        _ = cancel.cancelled() => return LoopOutcome::Cancelled,
        started = recognizer.start_listening() => match started {
            Ok(stream) => stream,
            Err(e) => return LoopOutcome::Failed(e),
        },
    };

    let mut heard_speech = false;
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return LoopOutcome::Cancelled,
            event = stream.next() => event,
        };

        match event {
            Some(RecognizerEvent::Transcript { text, .. }) => {
                if text.trim().is_empty() {
                    continue;
                }
                heard_speech = true;
                if let Some(phrase) = matcher.find(&text) {
                    return LoopOutcome::Heard {
                        phrase: phrase.to_string(),
                        transcript: text,
                    };
                }
            }
            Some(RecognizerEvent::Error(reason)) => {
                return LoopOutcome::Failed(MonitorError::Recognition(reason));
            }
            None => return LoopOutcome::Ended { heard_speech },
        }
    }
}
