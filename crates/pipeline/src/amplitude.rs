//! Visualizer amplitude sampling
//!
//! Purely observational: a failing level source only produces zeros.

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use voice_orchestrator_config::AmplitudeSettings;
use voice_orchestrator_core::{normalize_level, LevelSource};

use crate::{EventSink, Monitor, MonitorTask};

#[derive(Debug, Clone)]
pub struct AmplitudeConfig {
    pub poll_interval: Duration,
}

impl Default for AmplitudeConfig {
    fn default() -> Self {
        Self::from(&AmplitudeSettings::default())
    }
}

impl From<&AmplitudeSettings> for AmplitudeConfig {
    fn from(settings: &AmplitudeSettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// Polls whichever stream is live: output while the agent talks, input otherwise
pub struct AmplitudeSampler {
    config: AmplitudeConfig,
    task: MonitorTask,
}

impl AmplitudeSampler {
    pub fn new(config: AmplitudeConfig) -> Self {
        Self {
            config,
            task: MonitorTask::new("amplitude"),
        }
    }

    pub fn start(
        &self,
        source: Arc<dyn LevelSource>,
        agent_speaking: watch::Receiver<bool>,
        on_level: EventSink<f32>,
    ) -> bool {
        let interval = self.config.poll_interval;
        self.task.spawn(move |cancel| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut warned = false;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {},
                }

                let speaking = *agent_speaking.borrow();
                let sampled = catch_unwind(AssertUnwindSafe(|| {
                    if speaking {
                        source.output_level()
                    } else {
                        source.input_level()
                    }
                }));

                let level = match sampled {
                    Ok(level) => normalize_level(level),
                    Err(_) => {
                        if !warned {
                            tracing::warn!("Level source panicked, reporting silence");
                            warned = true;
                        }
                        0.0
                    }
                };
                on_level(level);
            }

            on_level(0.0);
        })
    }
}

#[async_trait]
impl Monitor for AmplitudeSampler {
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
