//! Orchestrator, context-feed and tool settings

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Session state machine timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Delay between construction and entering Sleeping (ms)
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,

    /// How long the Acknowledged display state lasts (ms)
    #[serde(default = "default_acknowledgment_ms")]
    pub acknowledgment_ms: u64,

    /// Upper bound on the transport handshake (ms)
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Upper bound on waiting for the transport to close (ms)
    #[serde(default = "default_close_timeout_ms")]
    pub transport_close_timeout_ms: u64,

    /// Play the local cue when the wake phrase is heard
    #[serde(default = "default_true")]
    pub cue_enabled: bool,

    /// Remote agent id passed to the transport handshake
    #[serde(default)]
    pub agent_id: Option<String>,
}

fn default_startup_grace_ms() -> u64 {
    1500
}
fn default_acknowledgment_ms() -> u64 {
    150
}
fn default_handshake_timeout_ms() -> u64 {
    15_000
}
fn default_close_timeout_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            startup_grace_ms: default_startup_grace_ms(),
            acknowledgment_ms: default_acknowledgment_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            transport_close_timeout_ms: default_close_timeout_ms(),
            cue_enabled: true,
            agent_id: None,
        }
    }
}

impl OrchestratorSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.acknowledgment_ms == 0 || self.acknowledgment_ms > 1000 {
            return Err(ConfigError::invalid(
                "orchestrator.acknowledgment_ms",
                format!("Must be between 1 and 1000ms, got {}", self.acknowledgment_ms),
            ));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "orchestrator.handshake_timeout_ms",
                "Must be at least 1ms",
            ));
        }
        if self.transport_close_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "orchestrator.transport_close_timeout_ms",
                "Must be at least 1ms",
            ));
        }
        Ok(())
    }
}

/// Context-feed subscription and throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    /// At most one context update is sent per window (ms)
    #[serde(default = "default_throttle_window_ms")]
    pub throttle_window_ms: u64,

    #[serde(default = "default_true")]
    pub watch_inventory: bool,

    #[serde(default = "default_true")]
    pub watch_shopping_list: bool,

    #[serde(default)]
    pub household_id: Option<String>,
}

fn default_throttle_window_ms() -> u64 {
    5000
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            throttle_window_ms: default_throttle_window_ms(),
            watch_inventory: true,
            watch_shopping_list: true,
            household_id: None,
        }
    }
}

impl ContextSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        // The remote session has a per-message cost budget
        if self.throttle_window_ms < 1000 {
            return Err(ConfigError::invalid(
                "context.throttle_window_ms",
                format!("Must be at least 1000ms, got {}", self.throttle_window_ms),
            ));
        }
        Ok(())
    }
}

/// Tool dispatch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Default per-call timeout (seconds)
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest quantity accepted by add_to_cart
    #[serde(default = "default_max_cart_quantity")]
    pub max_cart_quantity: u32,
}

fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_max_cart_quantity() -> u32 {
    99
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout_secs(),
            max_cart_quantity: default_max_cart_quantity(),
        }
    }
}

impl ToolSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "tools.timeout_secs",
                "Timeout must be at least 1 second",
            ));
        }
        if self.max_cart_quantity == 0 {
            return Err(ConfigError::invalid(
                "tools.max_cart_quantity",
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}
