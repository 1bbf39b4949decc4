//! The agent lifecycle.
//!
//! Phases: connect the sink (retrying forever), resolve the primary
//! adapter (fatal on failure), start one capture task per filter on the
//! primary, run the periodic statistics flush and the secondary-address
//! poller alongside, add secondary capture tasks once the address appears,
//! then wait for shutdown and drain.
//!
//! Losing the secondary address race to shutdown is a normal primary-only
//! run, not an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use flodvakt_capture::{resolve, DeviceInventory, InterfaceHandle, SourceFactory};
use flodvakt_config::FlodvaktConfig;
use flodvakt_core::{BoundedQueue, ShutdownSignal};
use flodvakt_sink::{connect_with_retry, SinkHandle, SinkWriter};
use flodvakt_telemetry::MetricsRecorder;

use crate::error::EngineError;
use crate::flush::{run_periodic_flush, StatsRegistry};
use crate::poller::{PollState, SecondaryAddressPoller};
use crate::task::{run_capture_task, TaskContext};

type CaptureHandle = JoinHandle<Result<(), EngineError>>;

/// Run the agent until shutdown trips. Returns an error when a capture
/// session, a flush or the sink fails; the caller exits non-zero on it.
pub async fn run_agent(
    config: FlodvaktConfig,
    inventory: Arc<dyn DeviceInventory>,
    factory: Arc<dyn SourceFactory>,
    shutdown: ShutdownSignal,
    metrics: MetricsRecorder,
) -> Result<(), EngineError> {
    // Capture starts only once the store is reachable, so the interfaces
    // are not even inspected until the connection is up.
    let connection = connect_with_retry(
        &config.sink.address,
        Duration::from_secs(config.sink.retry_delay_secs),
        &shutdown,
        || metrics.sink_connect_retries.inc(),
    )
    .await?;
    let (sink, writer_task) = SinkWriter::spawn(connection, config.sink.effective_stream_key());

    info!(adapter = %config.capture.primary_adapter, "resolving primary interface");
    let primary = resolve(inventory.as_ref(), &config.capture.primary_adapter)?;

    let registry = StatsRegistry::new();
    let mut capture_tasks: Vec<CaptureHandle> = Vec::new();

    info!(interface = %primary.label(), "starting primary capture");
    for filter in &config.capture.filters {
        // A session that cannot open on the primary adapter is startup-fatal.
        capture_tasks.push(spawn_capture(
            &config, &factory, &registry, &primary, filter, &sink, &shutdown, &metrics,
        )?);
    }

    let flush_task = tokio::spawn(run_periodic_flush(
        registry.clone(),
        sink.clone(),
        Duration::from_secs(config.queue.stats_flush_interval_secs),
        shutdown.clone(),
        metrics.clone(),
    ));

    if !config.capture.secondary_adapter.is_empty() {
        info!(
            prefix = %config.capture.secondary_address_prefix,
            "waiting for secondary address"
        );
        let poller = SecondaryAddressPoller::new(
            Arc::clone(&inventory),
            config.capture.secondary_address_prefix.clone(),
        );
        let state = poller
            .run(
                Duration::from_secs(config.capture.poll_interval_secs),
                shutdown.clone(),
            )
            .await;

        match state {
            PollState::Resolved(address) => {
                match resolve(inventory.as_ref(), &config.capture.secondary_adapter) {
                    Ok(handle) => {
                        let secondary = InterfaceHandle {
                            address: Some(address),
                            ..handle
                        };
                        info!(interface = %secondary.label(), "starting secondary capture");
                        for filter in &config.capture.filters {
                            match spawn_capture(
                                &config, &factory, &registry, &secondary, filter, &sink,
                                &shutdown, &metrics,
                            ) {
                                Ok(task) => capture_tasks.push(task),
                                Err(e) => {
                                    error!(filter = %filter, error = %e, "secondary session failed to open")
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "secondary interface unresolved, continuing with primary")
                    }
                }
            }
            PollState::Aborted | PollState::WaitingForAddress => {
                info!("shutdown before secondary address appeared");
            }
        }
    }

    // Top-level wait: capture tasks exit once shutdown trips, each having
    // drained its own queues.
    let mut result: Result<(), EngineError> = Ok(());
    for task in capture_tasks {
        let outcome = match task.await {
            Ok(task_result) => task_result,
            Err(join_error) => Err(join_error.into()),
        };
        result = result.and(outcome);
    }

    let flush_outcome = match flush_task.await {
        Ok(flush_result) => flush_result,
        Err(join_error) => Err(join_error.into()),
    };
    result = result.and(flush_outcome);

    drop(sink);
    let _ = writer_task.await;
    info!("agent stopped");
    result
}

#[allow(clippy::too_many_arguments)]
fn spawn_capture(
    config: &FlodvaktConfig,
    factory: &Arc<dyn SourceFactory>,
    registry: &StatsRegistry,
    interface: &InterfaceHandle,
    filter: &str,
    sink: &SinkHandle,
    shutdown: &ShutdownSignal,
    metrics: &MetricsRecorder,
) -> Result<CaptureHandle, EngineError> {
    let source = factory.open(
        interface,
        filter,
        Duration::from_millis(config.capture.read_timeout_ms),
    )?;

    let packet_queue = BoundedQueue::with_capacity(config.queue.max_queue_size)?;
    let stats_queue = BoundedQueue::with_capacity(config.queue.max_queue_size)?;
    registry.register(
        format!("{}/{}", interface.label(), filter),
        stats_queue.clone(),
    );

    let ctx = TaskContext {
        interface: interface.clone(),
        filter: filter.to_string(),
        packet_queue,
        stats_queue,
        sink: sink.clone(),
        stats_interval: Duration::from_secs(config.capture.stats_interval_secs),
        shutdown: shutdown.clone(),
        metrics: metrics.clone(),
    };
    Ok(tokio::task::spawn_blocking(move || {
        run_capture_task(source, ctx)
    }))
}
