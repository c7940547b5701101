//! Voice conversation orchestrator
//!
//! Features:
//! - Session state machine (`Idle`, `Sleeping`, `Listening`, `Processing`, `Speaking`)
//! - Monitor lifecycle in lock-step with state transitions
//! - Remote session ownership with off-loop handshake
//! - Throttled household context injection
//! - Tool-call routing to the tool registry
//! - Ordered, fire-and-forget transcript persistence
//!
//! # Example
//!
//! ```ignore
//! use voice_orchestrator_agent::{Collaborators, SessionOrchestrator};
//!
//! let orchestrator = SessionOrchestrator::spawn(&settings, collaborators, registry);
//! let outcome = orchestrator.start_conversation().await?;
//! // ...
//! orchestrator.end_conversation().await?;
//! ```

pub mod context;
pub mod error;
pub mod events;
pub mod history;
pub mod monitors;
pub mod orchestrator;
pub mod telemetry;

pub use context::{describe_change, feed_filter, ContextFeed, ContextThrottle};
pub use error::OrchestratorError;
pub use events::{Notice, OrchestratorEvent, OrchestratorSnapshot};
pub use history::HistoryWriter;
pub use monitors::{MonitorKind, Wanted};
pub use orchestrator::{Collaborators, SessionOrchestrator, StartOutcome};
pub use telemetry::init_tracing;
