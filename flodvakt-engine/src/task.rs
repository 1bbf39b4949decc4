//! One capture task: a session on one interface with one filter, polled
//! on a blocking thread from open to final drain.
//!
//! The session's read timeout doubles as the cancellation check cadence:
//! `next_packet` returns at least that often, the loop re-checks the
//! shutdown signal, and on shutdown both queues are flushed once more
//! before the session drops.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info};

use flodvakt_capture::{CaptureStats, InterfaceHandle, PacketSource};
use flodvakt_core::{
    BoundedQueue, MetricsRecord, PushOutcome, RawPacketRecord, RecordKind, ShutdownSignal,
    StatisticsRecord, TelemetryRecord,
};
use flodvakt_sink::SinkHandle;
use flodvakt_telemetry::MetricsRecorder;

use crate::error::EngineError;
use crate::flush::flush_blocking;

/// Everything a capture task owns besides its session.
pub struct TaskContext {
    pub interface: InterfaceHandle,
    pub filter: String,
    pub packet_queue: BoundedQueue<RawPacketRecord>,
    pub stats_queue: BoundedQueue<TelemetryRecord>,
    pub sink: SinkHandle,
    pub stats_interval: Duration,
    pub shutdown: ShutdownSignal,
    pub metrics: MetricsRecorder,
}

struct Sample {
    at: Instant,
    stats: CaptureStats,
    bytes: u64,
}

/// Throughput between two consecutive samples.
fn derive_metrics(
    prev: &Sample,
    current: &Sample,
    interface: &str,
    filter: &str,
) -> Option<MetricsRecord> {
    let secs = current.at.duration_since(prev.at).as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    let packets = current.stats.received.saturating_sub(prev.stats.received) as f64;
    let bits = current.bytes.saturating_sub(prev.bytes) as f64 * 8.0;
    Some(MetricsRecord {
        interface: interface.to_string(),
        timestamp: Utc::now(),
        bits_per_second: bits / secs,
        packets_per_second: packets / secs,
        filter: filter.to_string(),
    })
}

/// Run the task to completion. The final drain runs on every exit path,
/// including provider errors; a sink failure trips shutdown so the rest of
/// the pipeline stops too.
pub fn run_capture_task(
    mut source: Box<dyn PacketSource>,
    ctx: TaskContext,
) -> Result<(), EngineError> {
    info!(interface = %ctx.interface.label(), filter = %ctx.filter, "capture task started");

    let looped = capture_loop(source.as_mut(), &ctx);
    let drained = drain(&ctx);

    let result = looped.and(drained);
    if result.is_err() {
        ctx.shutdown.trip();
    }
    info!(interface = %ctx.interface.label(), filter = %ctx.filter, "capture task stopped");
    result
}

fn capture_loop(source: &mut dyn PacketSource, ctx: &TaskContext) -> Result<(), EngineError> {
    let label = ctx.interface.label();
    let mut bytes_total: u64 = 0;
    let mut last_sample: Option<Sample> = None;
    let mut next_stats_at = Instant::now() + ctx.stats_interval;

    while !ctx.shutdown.is_tripped() {
        match source.next_packet() {
            Ok(Some(frame)) => {
                bytes_total += frame.data.len() as u64;
                ctx.metrics.packets_captured.inc();
                if let PushOutcome::Overflow(batch) =
                    ctx.packet_queue.push(RawPacketRecord::new(frame.data))
                {
                    flush_blocking(&ctx.sink, RecordKind::Packets, batch, &ctx.metrics)?;
                }
            }
            Ok(None) => {} // read timeout; fall through to the checks below
            Err(e) => {
                error!(interface = %label, filter = %ctx.filter, error = %e, "capture session failed");
                return Err(e.into());
            }
        }

        if Instant::now() >= next_stats_at {
            next_stats_at += ctx.stats_interval;
            let stats = source.stats()?;
            let sample = Sample {
                at: Instant::now(),
                stats,
                bytes: bytes_total,
            };

            push_telemetry(
                ctx,
                TelemetryRecord::Statistics(StatisticsRecord {
                    interface: label.clone(),
                    filter: ctx.filter.clone(),
                    received: stats.received,
                    dropped: stats.dropped,
                    if_dropped: stats.if_dropped,
                    timestamp: Utc::now(),
                }),
            )?;

            if let Some(prev) = &last_sample {
                if let Some(metrics) = derive_metrics(prev, &sample, &label, &ctx.filter) {
                    push_telemetry(ctx, TelemetryRecord::Metrics(metrics))?;
                }
            }
            last_sample = Some(sample);
        }
    }
    Ok(())
}

fn push_telemetry(ctx: &TaskContext, record: TelemetryRecord) -> Result<(), EngineError> {
    if let PushOutcome::Overflow(batch) = ctx.stats_queue.push(record) {
        flush_blocking(&ctx.sink, RecordKind::Stats, batch, &ctx.metrics)?;
    }
    Ok(())
}

/// Final flush of whatever both queues still hold.
fn drain(ctx: &TaskContext) -> Result<(), EngineError> {
    let packets = ctx.packet_queue.detach();
    if !packets.is_empty() {
        flush_blocking(&ctx.sink, RecordKind::Packets, packets, &ctx.metrics)?;
    }
    let telemetry = ctx.stats_queue.detach();
    if !telemetry.is_empty() {
        flush_blocking(&ctx.sink, RecordKind::Stats, telemetry, &ctx.metrics)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(at: Instant, received: u64, bytes: u64) -> Sample {
        Sample {
            at,
            stats: CaptureStats {
                received,
                dropped: 0,
                if_dropped: 0,
            },
            bytes,
        }
    }

    #[test]
    fn throughput_from_consecutive_samples() {
        let start = Instant::now();
        let prev = sample(start, 100, 1000);
        let current = sample(start + Duration::from_secs(2), 300, 3000);

        let metrics = derive_metrics(&prev, &current, "10.8.0.2", "udp").unwrap();
        assert!((metrics.packets_per_second - 100.0).abs() < 1e-6);
        assert!((metrics.bits_per_second - 8000.0).abs() < 1e-6);
        assert_eq!(metrics.filter, "udp");
    }

    #[test]
    fn counter_reset_does_not_go_negative() {
        let start = Instant::now();
        let prev = sample(start, 500, 9000);
        let current = sample(start + Duration::from_secs(1), 10, 100);

        let metrics = derive_metrics(&prev, &current, "10.8.0.2", "tcp").unwrap();
        assert_eq!(metrics.packets_per_second, 0.0);
        assert_eq!(metrics.bits_per_second, 0.0);
    }

    #[test]
    fn zero_elapsed_yields_no_record() {
        let at = Instant::now();
        assert!(derive_metrics(&sample(at, 1, 1), &sample(at, 2, 2), "x", "tcp").is_none());
    }
}
