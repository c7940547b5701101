//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    AmplitudeSettings, BargeInSettings, ConfigError, ContextSettings, OrchestratorSettings,
    ToolSettings, VadSettings, WakeSettings,
};

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    #[serde(default)]
    pub wake: WakeSettings,

    #[serde(default)]
    pub vad: VadSettings,

    #[serde(default)]
    pub barge_in: BargeInSettings,

    #[serde(default)]
    pub amplitude: AmplitudeSettings,

    #[serde(default)]
    pub context: ContextSettings,

    #[serde(default)]
    pub tools: ToolSettings,

    /// Conversation history persistence (ScyllaDB)
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,

    /// Append structured session events to this JSON-lines file
    #[serde(default)]
    pub event_log_path: Option<String>,
}

fn default_scylla_hosts() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}

fn default_scylla_keyspace() -> String {
    "voice_orchestrator".to_string()
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
            event_log_path: None,
        }
    }
}

impl PersistenceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.scylla_hosts.is_empty() {
            return Err(ConfigError::invalid(
                "persistence.scylla_hosts",
                "At least one host is required when persistence is enabled",
            ));
        }
        let valid_keyspace = !self.keyspace.is_empty()
            && self
                .keyspace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_keyspace {
            return Err(ConfigError::invalid(
                "persistence.keyspace",
                format!("'{}' is not a valid keyspace name", self.keyspace),
            ));
        }
        if self.replication_factor == 0 {
            return Err(ConfigError::invalid(
                "persistence.replication_factor",
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (EnvFilter directive, overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Emit counters through the `metrics` facade
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orchestrator.validate()?;
        self.wake.validate()?;
        self.vad.validate()?;
        self.barge_in.validate()?;
        self.amplitude.validate()?;
        self.context.validate()?;
        self.tools.validate()?;
        self.persistence.validate()?;
        Ok(())
    }
}

/// Load settings from `config/` plus environment variables
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from a config directory
///
/// Sources, lowest precedence first: `{dir}/default`, `{dir}/{env}`, then
/// `VOICE_ORCHESTRATOR__SECTION__FIELD` environment variables.
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    if let Some(env_name) = env {
        let env_path = dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_ORCHESTRATOR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        env = env.unwrap_or("default"),
        persistence = settings.persistence.enabled,
        "Settings loaded"
    );

    Ok(settings)
}
