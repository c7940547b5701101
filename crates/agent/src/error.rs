//! Orchestrator handle errors

use thiserror::Error;
use voice_orchestrator_core::TransportError;
use voice_orchestrator_tools::RegistryError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[from] TransportError),

    #[error("Tools cannot be registered while a session is open")]
    SessionOpen,

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Invalid tool name: '{0}'")]
    InvalidToolName(String),

    #[error("Orchestrator has shut down")]
    Closed,
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Duplicate(name) => Self::DuplicateTool(name),
            RegistryError::InvalidName(name) => Self::InvalidToolName(name),
        }
    }
}
