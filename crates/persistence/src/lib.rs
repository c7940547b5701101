//! Conversation persistence
//!
//! Provides storage for:
//! - Conversation history (transcript lines per session)
//! - Structured session events for later analysis
//!
//! Both are fire-and-forget from the orchestrator's point of view: callers
//! log failures and carry on.

pub mod client;
pub mod conversation;
pub mod events;
pub mod schema;

pub use client::{ScyllaClient, ScyllaConfig};
pub use conversation::{InMemoryConversationStore, ScyllaConversationStore};
pub use events::{InMemoryEventLog, JsonLinesEventLog, MultiEventLog, TracingEventLog};

use std::sync::Arc;
use voice_orchestrator_config::PersistenceConfig;
use voice_orchestrator_core::{ConversationStore, PersistenceError, SessionEventLog};

/// Stores selected by configuration
pub struct PersistenceLayer {
    pub conversations: Arc<dyn ConversationStore>,
    pub events: Arc<dyn SessionEventLog>,
}

/// Initialize the persistence layer
///
/// ScyllaDB backs conversation history when enabled, in-memory otherwise.
/// Session events always go to tracing, plus a JSON-lines file when a path
/// is configured.
pub async fn init(config: &PersistenceConfig) -> Result<PersistenceLayer, PersistenceError> {
    let conversations: Arc<dyn ConversationStore> = if config.enabled {
        let client = ScyllaClient::connect_with_schema(&ScyllaConfig::from(config)).await?;
        Arc::new(ScyllaConversationStore::new(client))
    } else {
        tracing::info!("Persistence disabled, keeping conversation history in memory");
        Arc::new(InMemoryConversationStore::new())
    };

    let mut logs: Vec<Arc<dyn SessionEventLog>> = vec![Arc::new(TracingEventLog::new())];
    if let Some(path) = &config.event_log_path {
        logs.push(Arc::new(JsonLinesEventLog::open(path).await?));
    }

    Ok(PersistenceLayer {
        conversations,
        events: Arc::new(MultiEventLog::new(logs)),
    })
}
