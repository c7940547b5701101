//! Local acknowledgment cue

use async_trait::async_trait;

use crate::MonitorError;

/// Short local sound played when a wake phrase is heard
#[async_trait]
pub trait AcknowledgmentCue: Send + Sync + 'static {
    async fn play(&self) -> Result<(), MonitorError>;
}
