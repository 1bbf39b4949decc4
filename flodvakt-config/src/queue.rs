//! Queue sizing and flush cadence.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Bounded-queue configuration shared by all capture tasks.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct QueueConfig {
    /// Hard capacity of every per-task queue; reaching it triggers a
    /// backpressure flush.
    #[serde(default = "default_max_queue_size")]
    #[validate(range(min = 1, max = 1048576))]
    pub max_queue_size: usize,

    /// Interval of the periodic statistics flush. The periodic flush
    /// appends even when a queue is empty.
    #[serde(default = "default_stats_flush_interval")]
    #[validate(range(min = 1, max = 3600))]
    pub stats_flush_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            stats_flush_interval_secs: default_stats_flush_interval(),
        }
    }
}

fn default_max_queue_size() -> usize {
    10000
}

fn default_stats_flush_interval() -> u64 {
    10
}
