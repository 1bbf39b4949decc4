//! Interface discovery and resolution.
//!
//! Adapters are selected by a human-readable name fragment rather than an
//! exact device name: operators configure "Ethernet" or "TAP-Windows" and
//! the resolver picks the first capturable device whose description (or
//! name) contains it.

use std::net::{IpAddr, Ipv4Addr};

use crate::source::CaptureError;

/// A capturable device as reported by the platform.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub description: String,
    pub ipv4_addresses: Vec<Ipv4Addr>,
}

/// Discovery seam over the capture provider's device list.
pub trait DeviceInventory: Send + Sync {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;
}

/// A resolved, capturable interface. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceHandle {
    /// Platform device name passed to the capture provider on open.
    pub name: String,
    /// Human-readable description the fragment matched against.
    pub description: String,
    /// IPv4 address bound to the interface, when the platform reports one.
    pub address: Option<Ipv4Addr>,
}

impl InterfaceHandle {
    /// Label used in statistics records: the bound address, or the device
    /// name for address-less interfaces.
    pub fn label(&self) -> String {
        match self.address {
            Some(addr) => addr.to_string(),
            None => self.name.clone(),
        }
    }
}

/// Resolve a name fragment to the first matching capturable interface.
pub fn resolve(
    inventory: &dyn DeviceInventory,
    fragment: &str,
) -> Result<InterfaceHandle, CaptureError> {
    let devices = inventory.devices()?;
    if devices.is_empty() {
        return Err(CaptureError::NoDevices);
    }

    devices
        .into_iter()
        .find(|d| d.description.contains(fragment) || d.name.contains(fragment))
        .map(|d| InterfaceHandle {
            name: d.name,
            description: d.description,
            address: d.ipv4_addresses.first().copied(),
        })
        .ok_or_else(|| CaptureError::InterfaceNotFound {
            fragment: fragment.to_string(),
        })
}

/// All IPv4 addresses the host currently exposes on capturable interfaces.
///
/// The secondary-address poller calls this every interval; a tunnel address
/// shows up here once the adapter comes up.
pub fn local_ipv4_addresses(inventory: &dyn DeviceInventory) -> Result<Vec<Ipv4Addr>, CaptureError> {
    Ok(inventory
        .devices()?
        .into_iter()
        .flat_map(|d| d.ipv4_addresses)
        .collect())
}

/// Production inventory backed by `pcap::Device::list`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcapInventory;

impl DeviceInventory for PcapInventory {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let devices = pcap::Device::list()?;
        Ok(devices
            .into_iter()
            .map(|d| DeviceInfo {
                description: d.desc.clone().unwrap_or_else(|| d.name.clone()),
                ipv4_addresses: d
                    .addresses
                    .iter()
                    .filter_map(|a| match a.addr {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .collect(),
                name: d.name,
            })
            .collect())
    }
}
