//! Single-writer ownership of the sink connection.
//!
//! Every flush path appends through a [`SinkHandle`]; the writer task
//! serializes them onto the one connection in arrival order and replies
//! per job, so a capture task blocked on a backpressure flush resumes only
//! once its batch is acknowledged.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::error;

use crate::client::{SinkConnection, SinkError};

struct AppendJob {
    kind: String,
    payload: serde_json::Value,
    reply: oneshot::Sender<Result<(), SinkError>>,
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<AppendJob>,
}

impl SinkHandle {
    /// Append one batch and wait for the store's acknowledgement.
    pub async fn append(&self, kind: &str, payload: serde_json::Value) -> Result<(), SinkError> {
        let (reply, rx) = oneshot::channel();
        let job = AppendJob {
            kind: kind.to_string(),
            payload,
            reply,
        };
        self.tx.send(job).await.map_err(|_| SinkError::WriterClosed)?;
        rx.await.map_err(|_| SinkError::WriterClosed)?
    }

    /// Blocking variant for capture tasks running off the async runtime.
    pub fn append_blocking(&self, kind: &str, payload: serde_json::Value) -> Result<(), SinkError> {
        let (reply, rx) = oneshot::channel();
        let job = AppendJob {
            kind: kind.to_string(),
            payload,
            reply,
        };
        self.tx
            .blocking_send(job)
            .map_err(|_| SinkError::WriterClosed)?;
        rx.blocking_recv().map_err(|_| SinkError::WriterClosed)?
    }
}

/// Writer task wrapping one established connection.
pub struct SinkWriter;

impl SinkWriter {
    /// Spawn the writer. It runs until every handle is dropped or an
    /// append fails; after a failure the connection is considered dead and
    /// later appends observe [`SinkError::WriterClosed`].
    pub fn spawn(mut connection: SinkConnection, stream_key: String) -> (SinkHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<AppendJob>(16);

        let task = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let result = connection.append(&stream_key, &job.kind, job.payload).await;
                let failed = result.is_err();
                if let Err(e) = &result {
                    error!(kind = %job.kind, error = %e, "sink append failed");
                }
                let _ = job.reply.send(result);
                if failed {
                    return;
                }
            }
        });

        (SinkHandle { tx }, task)
    }
}
