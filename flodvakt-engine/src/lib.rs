//! # flodvakt-engine
//!
//! Capture orchestration: one capture task per (interface, filter) pair,
//! bounded queues with backpressure flushes, a periodic statistics flush,
//! and the poller that waits for the secondary adapter's address.
//!
//! The orchestrator walks the agent lifecycle: resolve the primary
//! adapter, connect the sink (retrying forever), start primary capture,
//! wait for the secondary address alongside it, start secondary capture
//! when the address appears, and drain everything on shutdown.

pub mod error;
pub mod flush;
pub mod orchestrator;
pub mod poller;
pub mod task;

pub use error::EngineError;
pub use orchestrator::run_agent;
pub use poller::{PollState, SecondaryAddressPoller};
