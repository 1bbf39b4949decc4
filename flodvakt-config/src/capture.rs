//! Packet capture configuration: which adapters to watch, with which
//! protocol filters, and how often sessions sample their counters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate, ValidationError};

use crate::validation;

/// Capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = validate_secondary_pairing))]
pub struct CaptureConfig {
    /// Name fragment of the primary adapter. Required; resolution failure
    /// at startup is fatal.
    #[validate(length(min = 1, message = "primary adapter fragment must not be empty"))]
    pub primary_adapter: String,

    /// Name fragment of the secondary adapter (e.g. a tunnel device whose
    /// address appears later). Empty disables secondary capture.
    #[serde(default)]
    pub secondary_adapter: String,

    /// Address prefix that identifies the secondary adapter's address once
    /// it comes up (e.g. "10.8.").
    #[serde(default)]
    pub secondary_address_prefix: String,

    /// Protocol filters; one capture session per (adapter, filter) pair.
    #[serde(default = "default_filters")]
    #[validate(custom(function = validation::validate_filters))]
    pub filters: Vec<String>,

    /// Interval between secondary-address polls.
    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 1, max = 60))]
    pub poll_interval_secs: u64,

    /// Interval between capture-statistics samples.
    #[serde(default = "default_stats_interval")]
    #[validate(range(min = 1, max = 300))]
    pub stats_interval_secs: u64,

    /// Read timeout of a capture session; also bounds how long shutdown
    /// can go unnoticed by a capture loop.
    #[serde(default = "default_read_timeout")]
    #[validate(range(min = 10, max = 10000))]
    pub read_timeout_ms: u64,
}

fn validate_secondary_pairing(config: &CaptureConfig) -> Result<(), ValidationError> {
    if config.secondary_adapter.is_empty() {
        return Ok(());
    }
    validation::validate_address_prefix(&config.secondary_address_prefix)
        .map_err(|_| ValidationError::new("secondary_adapter_requires_address_prefix"))
}

fn default_filters() -> Vec<String> {
    vec!["tcp".into(), "udp".into()]
}

fn default_poll_interval() -> u64 {
    5
}

fn default_stats_interval() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    1000
}
