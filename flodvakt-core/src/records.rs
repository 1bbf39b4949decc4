//! Record types carried through the capture pipeline.
//!
//! Everything here is produced by a capture task, held in a bounded queue,
//! serialized as part of one flush batch, and discarded after the sink
//! acknowledges the append.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Destination key of a flushed batch inside the host's stream.
///
/// Raw-packet batches and statistics batches land under distinct kinds so
/// consumers of the store can subscribe to either independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Packets,
    Stats,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Packets => "packets",
            RecordKind::Stats => "stats",
        }
    }
}

/// One captured frame: opaque payload plus capture timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPacketRecord {
    pub timestamp: DateTime<Utc>,
    pub data: Bytes,
}

impl RawPacketRecord {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            timestamp: Utc::now(),
            data: Bytes::from(data),
        }
    }
}

/// Snapshot of one capture session's counters at a sampling tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    /// Address bound to the captured interface.
    pub interface: String,
    /// Active protocol filter of the session.
    pub filter: String,
    /// Packets received by the session since open.
    pub received: u64,
    /// Packets dropped by the capture machinery since open.
    pub dropped: u64,
    /// Packets dropped by the interface itself since open.
    pub if_dropped: u64,
    pub timestamp: DateTime<Utc>,
}

/// Throughput derived from two consecutive statistics samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub interface: String,
    pub timestamp: DateTime<Utc>,
    pub bits_per_second: f64,
    pub packets_per_second: f64,
    pub filter: String,
}

/// Entry of the statistics queue: raw counter snapshots and derived
/// throughput records share one queue and one flush destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Statistics(StatisticsRecord),
    Metrics(MetricsRecord),
}
