use thiserror::Error;
use tokio::task::JoinError;

use flodvakt_capture::CaptureError;
use flodvakt_core::QueueError;
use flodvakt_sink::SinkError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Batch serialization error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
}
