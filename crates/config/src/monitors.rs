//! Local sensing monitor settings

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Wake-phrase listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeSettings {
    /// Phrases that open a conversation (matched case-insensitively)
    #[serde(default = "default_wake_phrases")]
    pub phrases: Vec<String>,

    /// Delay before restarting a recognition loop that ended (ms)
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Upper bound of the restart backoff (ms)
    #[serde(default = "default_max_restart_backoff_ms")]
    pub max_restart_backoff_ms: u64,

    /// Consecutive failures before the listener reports itself degraded
    #[serde(default = "default_degraded_after_failures")]
    pub degraded_after_failures: u32,
}

fn default_wake_phrases() -> Vec<String> {
    vec!["hey hearth".to_string()]
}
fn default_restart_delay_ms() -> u64 {
    300
}
fn default_max_restart_backoff_ms() -> u64 {
    10_000
}
fn default_degraded_after_failures() -> u32 {
    5
}

impl Default for WakeSettings {
    fn default() -> Self {
        Self {
            phrases: default_wake_phrases(),
            restart_delay_ms: default_restart_delay_ms(),
            max_restart_backoff_ms: default_max_restart_backoff_ms(),
            degraded_after_failures: default_degraded_after_failures(),
        }
    }
}

impl WakeSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "wake.phrases",
                "At least one non-empty wake phrase is required",
            ));
        }
        if self.restart_delay_ms == 0 {
            return Err(ConfigError::invalid(
                "wake.restart_delay_ms",
                "Must be at least 1ms",
            ));
        }
        if self.max_restart_backoff_ms < self.restart_delay_ms {
            return Err(ConfigError::invalid(
                "wake.max_restart_backoff_ms",
                format!(
                    "Cannot be smaller than restart_delay_ms ({})",
                    self.restart_delay_ms
                ),
            ));
        }
        Ok(())
    }
}

/// Voice-activity (end of user turn) detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    /// RMS level above which a frame counts as speech (0.0 - 1.0)
    #[serde(default = "default_vad_threshold")]
    pub energy_threshold: f32,

    /// Trailing silence that ends the user turn (ms)
    #[serde(default = "default_silence_ms")]
    pub silence_ms: u32,
}

fn default_vad_threshold() -> f32 {
    0.02
}
fn default_silence_ms() -> u32 {
    2000
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            energy_threshold: default_vad_threshold(),
            silence_ms: default_silence_ms(),
        }
    }
}

impl VadSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_level("vad.energy_threshold", self.energy_threshold)?;
        if self.silence_ms == 0 {
            return Err(ConfigError::invalid("vad.silence_ms", "Must be at least 1ms"));
        }
        Ok(())
    }
}

/// Barge-in (user speech over agent audio) detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BargeInSettings {
    /// Enable barge-in handling
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// RMS level above which a frame counts as user speech (0.0 - 1.0)
    #[serde(default = "default_barge_in_threshold")]
    pub energy_threshold: f32,

    /// Minimum accumulated speech before interrupting (ms)
    #[serde(default = "default_min_speech_ms")]
    pub min_speech_ms: u32,

    /// Ignore speech right after agent audio starts (ms)
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u32,
}

fn default_true() -> bool {
    true
}
fn default_barge_in_threshold() -> f32 {
    0.05
}
fn default_min_speech_ms() -> u32 {
    150
}
fn default_grace_period_ms() -> u32 {
    300
}

impl Default for BargeInSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_threshold: default_barge_in_threshold(),
            min_speech_ms: default_min_speech_ms(),
            grace_period_ms: default_grace_period_ms(),
        }
    }
}

impl BargeInSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_level("barge_in.energy_threshold", self.energy_threshold)?;
        if self.min_speech_ms == 0 {
            return Err(ConfigError::invalid(
                "barge_in.min_speech_ms",
                "Must be at least 1ms",
            ));
        }
        Ok(())
    }
}

/// Visualizer amplitude sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmplitudeSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for AmplitudeSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl AmplitudeSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < 10 {
            return Err(ConfigError::invalid(
                "amplitude.poll_interval_ms",
                "Polling faster than 10ms is not supported",
            ));
        }
        Ok(())
    }
}

fn validate_level(field: &str, value: f32) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::invalid(
            field,
            format!("Must be in (0.0, 1.0], got {}", value),
        ));
    }
    Ok(())
}
