//! Speech recognition traits

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::MonitorError;

/// Discrete event emitted by a running recognition loop
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    /// Recognized speech (partial or final)
    Transcript { text: String, is_final: bool },
    /// Recognition failed; the loop may still continue
    Error(String),
}

/// Recognition loop output; the stream ending means the loop ended
/// (for example a platform timeout)
pub type RecognizerStream = Pin<Box<dyn Stream<Item = RecognizerEvent> + Send>>;

/// Local speech-recognition engine
///
/// Implementations wrap a platform recognizer. A started loop may end on its
/// own at any time; callers are expected to restart it if they still need it.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync + 'static {
    /// Start a recognition loop
    async fn start_listening(&self) -> Result<RecognizerStream, MonitorError>;

    /// Stop the current loop; must be safe when nothing is running
    async fn stop_listening(&self);

    /// Engine name for logging
    fn name(&self) -> &str {
        "speech-recognizer"
    }
}
