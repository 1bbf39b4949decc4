//! Capture sessions.
//!
//! A [`PacketSource`] is one open session on one interface with one filter
//! applied. pcap delivers both frames and counter samples through a single
//! handle, so a session is opened once per (interface, filter) pair.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::resolve::InterfaceHandle;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No capturable interfaces reported by the platform")]
    NoDevices,

    #[error("No interface matching '{fragment}' found")]
    InterfaceNotFound { fragment: String },

    #[error("Capture provider error: {0}")]
    Provider(#[from] pcap::Error),
}

/// One captured frame, payload only; the record timestamp is assigned at
/// enqueue time.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Vec<u8>,
}

/// Counters of one session since open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Packets received by the session.
    pub received: u64,
    /// Packets dropped by the capture machinery.
    pub dropped: u64,
    /// Packets dropped by the interface.
    pub if_dropped: u64,
}

/// An open capture session. `next_packet` honors the read timeout the
/// session was opened with and returns `None` when it expires, which is
/// how capture loops get their cancellation-check cadence.
pub trait PacketSource: Send {
    fn next_packet(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
    fn stats(&mut self) -> Result<CaptureStats, CaptureError>;
}

/// Session construction seam.
pub trait SourceFactory: Send + Sync {
    fn open(
        &self,
        handle: &InterfaceHandle,
        filter: &str,
        read_timeout: Duration,
    ) -> Result<Box<dyn PacketSource>, CaptureError>;
}

struct PcapSource {
    capture: pcap::Capture<pcap::Active>,
}

impl PacketSource for PcapSource {
    fn next_packet(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(CapturedFrame {
                data: packet.data.to_vec(),
            })),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stats(&mut self) -> Result<CaptureStats, CaptureError> {
        let stat = self.capture.stats()?;
        Ok(CaptureStats {
            received: stat.received as u64,
            dropped: stat.dropped as u64,
            if_dropped: stat.if_dropped as u64,
        })
    }
}

/// Production factory opening live pcap sessions.
#[derive(Debug, Clone, Copy)]
pub struct PcapSourceFactory {
    pub promiscuous: bool,
    pub snaplen: i32,
}

impl Default for PcapSourceFactory {
    fn default() -> Self {
        Self {
            promiscuous: true,
            snaplen: 65535,
        }
    }
}

impl SourceFactory for PcapSourceFactory {
    fn open(
        &self,
        handle: &InterfaceHandle,
        filter: &str,
        read_timeout: Duration,
    ) -> Result<Box<dyn PacketSource>, CaptureError> {
        let mut capture = pcap::Capture::from_device(handle.name.as_str())?
            .promisc(self.promiscuous)
            .snaplen(self.snaplen)
            .timeout(read_timeout.as_millis() as i32)
            .open()?;
        capture.filter(filter, true)?;
        debug!(interface = %handle.name, filter, "capture session opened");
        Ok(Box::new(PcapSource { capture }))
    }
}
