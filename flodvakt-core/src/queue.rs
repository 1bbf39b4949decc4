//! # Bounded Event Queue
//!
//! A capacity-bounded FIFO shared between one producing capture task and
//! the flush path. The queue never silently drops a record: when a push
//! would exceed capacity, the producer receives the detached batch and is
//! expected to flush it before continuing.
//!
//! ## Overflow ordering (binding contract)
//! The detached overflow batch contains exactly the records present before
//! the triggering push; the triggering record is installed as the first
//! element of the fresh queue. With capacity 3 and pushes `A,B,C,D`, the
//! overflow batch is `[A,B,C]` and the queue afterwards holds `[D]`.
//!
//! ## Synchronization
//! `detach` swaps the backing buffer under the queue mutex; that swap is
//! the only synchronization boundary between producers and the flush
//! routine. Records pushed after the swap belong unambiguously to the next
//! batch.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid capacity (must be nonzero)")]
    InvalidCapacity,
}

/// Result of a push: either the record was stored under capacity, or the
/// previous contents were detached and must be flushed by the caller.
#[must_use]
pub enum PushOutcome<T> {
    Stored,
    Overflow(Vec<T>),
}

struct Inner<T> {
    buffer: Mutex<Vec<T>>,
    capacity: usize,
}

/// Thread-safe bounded FIFO with Arc-based sharing.
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BoundedQueue<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                buffer: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffer.lock().is_empty()
    }

    /// Append a record, detaching the full buffer first when at capacity.
    pub fn push(&self, record: T) -> PushOutcome<T> {
        let mut buffer = self.inner.buffer.lock();
        if buffer.len() < self.inner.capacity {
            buffer.push(record);
            return PushOutcome::Stored;
        }

        let batch = mem::replace(&mut *buffer, Vec::with_capacity(self.inner.capacity));
        buffer.push(record);
        PushOutcome::Overflow(batch)
    }

    /// Atomically detach the current contents, leaving an empty queue.
    ///
    /// Calling twice without intervening pushes yields one possibly
    /// non-empty batch and one empty batch.
    pub fn detach(&self) -> Vec<T> {
        let mut buffer = self.inner.buffer.lock();
        mem::replace(&mut *buffer, Vec::with_capacity(self.inner.capacity))
    }
}
