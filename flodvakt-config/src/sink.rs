//! Stream sink connection parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Stream-store sink configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SinkConfig {
    /// `host:port` of the stream store. Required; no default.
    #[validate(custom(function = validation::validate_sink_address))]
    pub address: String,

    /// Fixed delay between connection attempts while the store is down.
    #[serde(default = "default_retry_delay")]
    #[validate(range(min = 1, max = 300))]
    pub retry_delay_secs: u64,

    /// Stream key under which this agent appends. Defaults to the host name
    /// so several agents can share one store without collision.
    #[serde(default)]
    pub stream_key: Option<String>,
}

impl SinkConfig {
    /// The stream key actually used: configured value or the host name.
    pub fn effective_stream_key(&self) -> String {
        match &self.stream_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown-host".to_string()),
        }
    }
}

fn default_retry_delay() -> u64 {
    10
}
