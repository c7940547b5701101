//! Context updates pushed into an open session

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// What a context update describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Initial,
    InventoryDelta,
    CartSnapshot,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::InventoryDelta => "inventory_delta",
            Self::CartSnapshot => "cart_snapshot",
        }
    }
}

/// Out-of-band text snapshot proposed for delivery to the remote agent
///
/// `emitted_at` is the proposal time; the orchestrator's throttle decides
/// whether the update is actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUpdate {
    pub kind: ContextKind,
    pub payload: String,
    pub emitted_at: Instant,
}

impl ContextUpdate {
    pub fn new(kind: ContextKind, payload: impl Into<String>) -> Self {
        Self::at(kind, payload, Instant::now())
    }

    pub fn at(kind: ContextKind, payload: impl Into<String>, emitted_at: Instant) -> Self {
        Self {
            kind,
            payload: payload.into(),
            emitted_at,
        }
    }
}
