//! # Flodvakt Telemetry
//!
//! Logging and metrics for the capture agent.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
