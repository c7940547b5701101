//! Local sensing monitors
//!
//! Four independently scheduled loops feed discrete events to the session
//! orchestrator:
//! - [`WakePhraseListener`]: continuous recognition while the device sleeps
//! - [`VoiceActivityMonitor`]: trailing silence that ends a user turn
//! - [`BargeInMonitor`]: user speech over agent audio
//! - [`AmplitudeSampler`]: loudness for the visualizer, never for control
//!
//! Every monitor is restartable and `stop()` is idempotent. Each one owns its
//! background task through [`MonitorTask`], so stopping a monitor also cancels
//! its timers.

pub mod amplitude;
pub mod barge_in;
pub mod task;
pub mod vad;
pub mod wake;

pub use amplitude::{AmplitudeConfig, AmplitudeSampler};
pub use barge_in::{BargeInConfig, BargeInDetector, BargeInEvent, BargeInMonitor};
pub use task::MonitorTask;
pub use vad::{SilenceDetector, VadConfig, VadEvent, VoiceActivityMonitor};
pub use wake::{restart_backoff, PhraseMatcher, WakeConfig, WakeEvent, WakePhraseListener};

use async_trait::async_trait;
use std::sync::Arc;

/// Callback through which a monitor reports its events
pub type EventSink<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Lifecycle shared by all monitors
#[async_trait]
pub trait Monitor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the background loop is currently running
    fn is_active(&self) -> bool;

    /// Stop the loop and release its device; safe when not started
    async fn stop(&self);
}
