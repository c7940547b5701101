//! Audio input traits

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::{LevelFrame, MonitorError};

/// Microphone loudness frames; an `Err` item or the stream ending means the
/// device was lost
pub type LevelStream = Pin<Box<dyn Stream<Item = Result<LevelFrame, MonitorError>> + Send>>;

/// Microphone capture
#[async_trait]
pub trait AudioInput: Send + Sync + 'static {
    /// Open the microphone and stream per-frame loudness
    ///
    /// Dropping the stream releases the device.
    async fn open(&self) -> Result<LevelStream, MonitorError>;
}

/// Instantaneous input/output level probe (0.0 - 1.0)
pub trait LevelSource: Send + Sync {
    fn input_level(&self) -> f32;

    fn output_level(&self) -> f32;
}
