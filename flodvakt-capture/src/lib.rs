//! # flodvakt-capture
//!
//! Interface resolution and live capture sessions over pcap.
//!
//! The engine talks to two seams defined here instead of to libpcap:
//! [`DeviceInventory`] for interface discovery and [`SourceFactory`] /
//! [`PacketSource`] for open capture sessions, so the whole pipeline can be
//! driven by scripted sources in tests.

pub mod resolve;
pub mod source;

pub use resolve::{
    local_ipv4_addresses, resolve, DeviceInfo, DeviceInventory, InterfaceHandle, PcapInventory,
};
pub use source::{
    CaptureError, CaptureStats, CapturedFrame, PacketSource, PcapSourceFactory, SourceFactory,
};
