//! Prometheus metrics for the capture pipeline.

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Frames pushed into packet queues.
    pub packets_captured: Counter,
    /// Records (packet + telemetry) appended to the sink.
    pub records_flushed: Counter,
    /// Append calls made, including empty periodic batches.
    pub flushes: Counter,
    /// Connection attempts that failed and were retried.
    pub sink_connect_retries: Counter,
    /// Wall time of one flush, detach to acknowledgement.
    pub flush_duration: Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let packets_captured =
            Counter::new("flodvakt_packets_captured_total", "Captured frames enqueued").unwrap();
        let records_flushed =
            Counter::new("flodvakt_records_flushed_total", "Records appended to the sink").unwrap();
        let flushes = Counter::new("flodvakt_flushes_total", "Append calls made").unwrap();
        let sink_connect_retries = Counter::new(
            "flodvakt_sink_connect_retries_total",
            "Failed sink connection attempts",
        )
        .unwrap();
        let flush_duration = Histogram::with_opts(
            HistogramOpts::new("flodvakt_flush_duration_seconds", "Flush wall time")
                .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
        )
        .unwrap();

        registry.register(Box::new(packets_captured.clone())).unwrap();
        registry.register(Box::new(records_flushed.clone())).unwrap();
        registry.register(Box::new(flushes.clone())).unwrap();
        registry
            .register(Box::new(sink_connect_retries.clone()))
            .unwrap();
        registry.register(Box::new(flush_duration.clone())).unwrap();

        Self {
            registry,
            packets_captured,
            records_flushed,
            flushes,
            sink_connect_retries,
            flush_duration,
        }
    }

    /// Render the registry in the Prometheus text format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}
