//! # flodvakt-sink
//!
//! Client for the append-only stream store.
//!
//! One TCP connection carries every flush. Appends are length-prefixed
//! JSON frames acknowledged by a single status byte; the connection is
//! owned by a single writer task ([`writer::SinkWriter`]) and shared
//! through cloneable handles, so appends from different flush paths
//! interleave but each one is atomic from its caller's view.

pub mod client;
pub mod frame;
pub mod writer;

pub use client::{connect_with_retry, SinkConnection, SinkError};
pub use frame::AppendRequest;
pub use writer::{SinkHandle, SinkWriter};
