//! # flodvakt-core
//!
//! Foundation layer for the capture pipeline: record types, the bounded
//! event queue with its backpressure contract, and the shared shutdown
//! signal every long-running task observes.
//!
//! ### Key Submodules:
//! - `records`: serde-serializable record types flushed to the stream sink
//! - `queue`: capacity-bounded FIFO with atomic batch detach
//! - `shutdown`: cooperative cancellation flag shared across tasks

pub mod queue;
pub mod records;
pub mod shutdown;

pub use queue::{BoundedQueue, PushOutcome, QueueError};
pub use records::{MetricsRecord, RawPacketRecord, RecordKind, StatisticsRecord, TelemetryRecord};
pub use shutdown::ShutdownSignal;
