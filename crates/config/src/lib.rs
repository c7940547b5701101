//! Configuration management for the voice orchestrator
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (VOICE_ORCHESTRATOR__ prefix, `__` separator)
//! - Runtime overrides
//!
//! Monitor thresholds live in their own sections: the orchestrator only
//! reacts to monitor events and never reads them.

pub mod monitors;
pub mod orchestrator;
pub mod settings;

pub use monitors::{AmplitudeSettings, BargeInSettings, VadSettings, WakeSettings};
pub use orchestrator::{ContextSettings, OrchestratorSettings, ToolSettings};
pub use settings::{
    load_settings, load_settings_from, ObservabilityConfig, PersistenceConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
