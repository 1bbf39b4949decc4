//! Cooperative shutdown signal shared by every long-running task.
//!
//! Blocking capture loops check the flag once per read-timeout interval;
//! async tasks can additionally await [`ShutdownSignal::tripped`] to react
//! without waiting out their own tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trip(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_tripped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once the signal trips; immediately if it already has.
    pub async fn tripped(&self) {
        loop {
            // Register before checking to avoid missing a concurrent trip.
            let notified = self.notify.notified();
            if self.is_tripped() {
                return;
            }
            notified.await;
        }
    }
}
