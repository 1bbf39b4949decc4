//! Sink connection: startup reconnect loop and the append call.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{info, warn};

use flodvakt_core::ShutdownSignal;

use crate::frame::{self, AppendRequest, ACK_OK};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Batch encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),

    #[error("Store rejected append with code {code}")]
    Rejected { code: u8 },

    #[error("Shutdown requested before the sink became reachable")]
    ConnectAborted,

    #[error("Sink writer is no longer running")]
    WriterClosed,
}

/// An established connection to the stream store.
pub struct SinkConnection {
    stream: TcpStream,
}

impl SinkConnection {
    /// Append one batch under `stream_key`/`kind`. Atomic from the caller's
    /// view: the call returns once the store acknowledged the frame.
    pub async fn append(
        &mut self,
        stream_key: &str,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), SinkError> {
        let frame = frame::encode(&AppendRequest {
            stream: stream_key.to_string(),
            kind: kind.to_string(),
            payload,
        })?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        let mut ack = [0u8; 1];
        self.stream.read_exact(&mut ack).await?;
        match ack[0] {
            ACK_OK => Ok(()),
            code => Err(SinkError::Rejected { code }),
        }
    }
}

/// Connect to the store, retrying with a fixed delay until it succeeds or
/// shutdown trips.
///
/// The agent is useless without a sink and an unreachable store is expected
/// to be transient, so this is the one condition retried forever. The
/// warning message shape is identical across attempts to keep log volume
/// bounded.
pub async fn connect_with_retry(
    address: &str,
    retry_delay: Duration,
    shutdown: &ShutdownSignal,
    mut on_retry: impl FnMut(),
) -> Result<SinkConnection, SinkError> {
    loop {
        if shutdown.is_tripped() {
            return Err(SinkError::ConnectAborted);
        }
        match TcpStream::connect(address).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                info!(address, "connected to stream store");
                return Ok(SinkConnection { stream });
            }
            Err(e) => {
                warn!(address, error = %e, "stream store unreachable, retrying");
                on_retry();
                sleep(retry_delay).await;
            }
        }
    }
}
