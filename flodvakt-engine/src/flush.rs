//! Flush helpers and the periodic statistics flush task.
//!
//! A flush is: detach the queue, serialize the batch, one append on the
//! sink, discard the batch. The periodic task applies this to every
//! registered statistics queue on a fixed interval and appends even when a
//! batch is empty, so the store sees a heartbeat per session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use flodvakt_core::{BoundedQueue, RecordKind, ShutdownSignal, TelemetryRecord};
use flodvakt_sink::SinkHandle;
use flodvakt_telemetry::MetricsRecorder;

use crate::error::EngineError;

/// Serialize one detached batch into the self-describing append payload.
pub fn serialize_batch<T: Serialize>(batch: &[T]) -> Result<serde_json::Value, EngineError> {
    Ok(serde_json::to_value(batch)?)
}

/// Blocking flush used by capture tasks (backpressure and final drain).
pub fn flush_blocking<T: Serialize>(
    sink: &SinkHandle,
    kind: RecordKind,
    batch: Vec<T>,
    metrics: &MetricsRecorder,
) -> Result<(), EngineError> {
    let payload = serialize_batch(&batch)?;
    let started = Instant::now();
    sink.append_blocking(kind.as_str(), payload)?;
    record_flush(metrics, batch.len(), started);
    Ok(())
}

/// Async flush used by the periodic statistics task.
pub async fn flush_async<T: Serialize>(
    sink: &SinkHandle,
    kind: RecordKind,
    batch: Vec<T>,
    metrics: &MetricsRecorder,
) -> Result<(), EngineError> {
    let payload = serialize_batch(&batch)?;
    let started = Instant::now();
    sink.append(kind.as_str(), payload).await?;
    record_flush(metrics, batch.len(), started);
    Ok(())
}

fn record_flush(metrics: &MetricsRecorder, records: usize, started: Instant) {
    metrics.flushes.inc();
    metrics.records_flushed.inc_by(records as f64);
    metrics.flush_duration.observe(started.elapsed().as_secs_f64());
}

struct RegisteredQueue {
    label: String,
    queue: BoundedQueue<TelemetryRecord>,
}

/// Statistics queues currently owned by running capture tasks. Tasks
/// register at start; the periodic flush snapshots the registry each tick.
#[derive(Clone, Default)]
pub struct StatsRegistry {
    inner: Arc<Mutex<Vec<RegisteredQueue>>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, label: String, queue: BoundedQueue<TelemetryRecord>) {
        self.inner.lock().push(RegisteredQueue { label, queue });
    }

    fn snapshot(&self) -> Vec<(String, BoundedQueue<TelemetryRecord>)> {
        self.inner
            .lock()
            .iter()
            .map(|r| (r.label.clone(), r.queue.clone()))
            .collect()
    }
}

/// Periodic statistics flush. Runs until shutdown; a sink failure trips
/// shutdown so the capture tasks stop too, then ends the task with an
/// error the orchestrator treats as fatal.
pub async fn run_periodic_flush(
    registry: StatsRegistry,
    sink: SinkHandle,
    interval: Duration,
    shutdown: ShutdownSignal,
    metrics: MetricsRecorder,
) -> Result<(), EngineError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick of `interval` fires immediately; skip it so the first
    // flush happens one full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.tripped() => return Ok(()),
        }
        if shutdown.is_tripped() {
            return Ok(());
        }
        for (label, queue) in registry.snapshot() {
            let batch = queue.detach();
            debug!(session = %label, records = batch.len(), "periodic statistics flush");
            if let Err(e) = flush_async(&sink, RecordKind::Stats, batch, &metrics).await {
                shutdown.trip();
                return Err(e);
            }
        }
    }
}
