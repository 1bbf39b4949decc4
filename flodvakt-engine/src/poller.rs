//! Secondary-address discovery.
//!
//! Some adapters (tunnel devices in particular) only acquire an address
//! after an external event. The poller queries the host's addresses on a
//! fixed interval until one matches the expected prefix, shutdown trips,
//! or forever; an address that never appears is not an error.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use flodvakt_capture::{local_ipv4_addresses, DeviceInventory};
use flodvakt_core::ShutdownSignal;

/// Poller state. `WaitingForAddress` is re-entered on every miss, so an
/// address that flaps before it is first observed keeps the poller polling
/// rather than erroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    WaitingForAddress,
    Resolved(Ipv4Addr),
    Aborted,
}

pub struct SecondaryAddressPoller {
    inventory: Arc<dyn DeviceInventory>,
    prefix: String,
    state: PollState,
}

impl SecondaryAddressPoller {
    pub fn new(inventory: Arc<dyn DeviceInventory>, prefix: String) -> Self {
        Self {
            inventory,
            prefix,
            state: PollState::WaitingForAddress,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// One polling step. Terminal states are sticky.
    pub fn poll_once(&mut self, shutdown: &ShutdownSignal) -> &PollState {
        if self.state != PollState::WaitingForAddress {
            return &self.state;
        }
        if shutdown.is_tripped() {
            self.state = PollState::Aborted;
            return &self.state;
        }

        match local_ipv4_addresses(self.inventory.as_ref()) {
            Ok(addresses) => {
                if let Some(addr) = addresses
                    .iter()
                    .find(|a| a.to_string().starts_with(&self.prefix))
                {
                    info!(address = %addr, "secondary address appeared");
                    self.state = PollState::Resolved(*addr);
                }
            }
            Err(e) => {
                // Inventory hiccups are transient; keep waiting.
                warn!(error = %e, "address poll failed, still waiting");
            }
        }
        &self.state
    }

    /// Poll on `interval` until resolved or aborted. A trip during the
    /// sleep is observed on the next step rather than a full interval late.
    pub async fn run(mut self, interval: Duration, shutdown: ShutdownSignal) -> PollState {
        loop {
            match self.poll_once(&shutdown) {
                PollState::WaitingForAddress => {
                    tokio::select! {
                        _ = sleep(interval) => {}
                        _ = shutdown.tripped() => {}
                    }
                }
                terminal => return terminal.clone(),
            }
        }
    }
}
