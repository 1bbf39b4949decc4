//! End-to-end pipeline tests: scripted capture sources feeding the real
//! orchestrator, queues and sink writer, against an in-process store.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

use flodvakt_capture::{
    CaptureError, CaptureStats, CapturedFrame, DeviceInfo, DeviceInventory, InterfaceHandle,
    PacketSource, SourceFactory,
};
use flodvakt_config::{CaptureConfig, FlodvaktConfig, QueueConfig, SinkConfig};
use flodvakt_core::ShutdownSignal;
use flodvakt_engine::run_agent;
use flodvakt_sink::frame;
use flodvakt_telemetry::MetricsRecorder;

/// Source yielding a fixed list of frames, then read timeouts forever.
struct ScriptedSource {
    frames: VecDeque<Vec<u8>>,
    delivered: u64,
}

impl ScriptedSource {
    fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            delivered: 0,
        }
    }
}

impl PacketSource for ScriptedSource {
    fn next_packet(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        match self.frames.pop_front() {
            Some(data) => {
                self.delivered += 1;
                Ok(Some(CapturedFrame { data }))
            }
            None => {
                // Simulate the session's read timeout.
                thread::sleep(Duration::from_millis(10));
                Ok(None)
            }
        }
    }

    fn stats(&mut self) -> Result<CaptureStats, CaptureError> {
        Ok(CaptureStats {
            received: self.delivered,
            dropped: 0,
            if_dropped: 0,
        })
    }
}

/// Factory handing out pre-scripted sources keyed by (device, filter).
struct ScriptedFactory {
    sources: Mutex<HashMap<(String, String), Vec<Vec<u8>>>>,
}

impl ScriptedFactory {
    fn new(sources: Vec<((&str, &str), Vec<Vec<u8>>)>) -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(
                sources
                    .into_iter()
                    .map(|((dev, filter), frames)| ((dev.to_string(), filter.to_string()), frames))
                    .collect(),
            ),
        })
    }
}

impl SourceFactory for ScriptedFactory {
    fn open(
        &self,
        handle: &InterfaceHandle,
        filter: &str,
        _read_timeout: Duration,
    ) -> Result<Box<dyn PacketSource>, CaptureError> {
        let frames = self
            .sources
            .lock()
            .remove(&(handle.name.clone(), filter.to_string()))
            .unwrap_or_default();
        Ok(Box::new(ScriptedSource::new(frames)))
    }
}

struct MutableInventory {
    devices: Mutex<Vec<DeviceInfo>>,
}

impl MutableInventory {
    fn new(devices: Vec<DeviceInfo>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices),
        })
    }

    fn add(&self, device: DeviceInfo) {
        self.devices.lock().push(device);
    }
}

impl DeviceInventory for MutableInventory {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        Ok(self.devices.lock().clone())
    }
}

/// Inventory counting how often it is queried.
struct CountingInventory {
    devices: Vec<DeviceInfo>,
    queries: AtomicUsize,
}

impl CountingInventory {
    fn new(devices: Vec<DeviceInfo>) -> Arc<Self> {
        Arc::new(Self {
            devices,
            queries: AtomicUsize::new(0),
        })
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl DeviceInventory for CountingInventory {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.clone())
    }
}

fn eth0() -> DeviceInfo {
    DeviceInfo {
        name: "eth0".into(),
        description: "Intel Ethernet Adapter".into(),
        ipv4_addresses: vec![Ipv4Addr::new(192, 168, 1, 10)],
    }
}

fn tun0() -> DeviceInfo {
    DeviceInfo {
        name: "tun0".into(),
        description: "TAP-Windows Adapter".into(),
        ipv4_addresses: vec![Ipv4Addr::new(10, 8, 0, 2)],
    }
}

fn test_config(sink_address: String) -> FlodvaktConfig {
    FlodvaktConfig {
        sink: SinkConfig {
            address: sink_address,
            retry_delay_secs: 1,
            stream_key: Some("test-host".into()),
        },
        capture: CaptureConfig {
            primary_adapter: "Ethernet".into(),
            secondary_adapter: String::new(),
            secondary_address_prefix: String::new(),
            filters: vec!["tcp".into()],
            poll_interval_secs: 1,
            stats_interval_secs: 300,
            read_timeout_ms: 50,
        },
        queue: QueueConfig {
            max_queue_size: 3,
            stats_flush_interval_secs: 300,
        },
    }
}

/// Store accepting one connection and acknowledging appends until EOF.
async fn spawn_store() -> (String, Arc<Mutex<Vec<frame::AppendRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    (address, spawn_store_on(listener))
}

fn spawn_store_on(listener: TcpListener) -> Arc<Mutex<Vec<frame::AppendRequest>>> {
    let appends: Arc<Mutex<Vec<frame::AppendRequest>>> = Arc::default();

    let seen = Arc::clone(&appends);
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        loop {
            let mut len_buf = [0u8; 4];
            if socket.read_exact(&mut len_buf).await.is_err() {
                return;
            }
            let mut body = vec![0u8; u32::from_be_bytes(len_buf) as usize];
            socket.read_exact(&mut body).await.unwrap();
            seen.lock().push(frame::decode(&body).unwrap());
            socket.write_all(&[frame::ACK_OK]).await.unwrap();
        }
    });

    appends
}

/// Store that reads one append frame and drops the connection without
/// acknowledging it.
async fn spawn_dying_store() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut len_buf = [0u8; 4];
        if socket.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let mut body = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        let _ = socket.read_exact(&mut body).await;
    });

    address
}

fn packet_payload_bytes(appends: &[frame::AppendRequest]) -> Vec<Vec<u8>> {
    appends
        .iter()
        .filter(|a| a.kind == "packets")
        .flat_map(|a| a.payload.as_array().unwrap().clone())
        .map(|record| {
            record["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_u64().unwrap() as u8)
                .collect()
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn backpressure_flush_then_drain_is_exactly_once() {
    let (address, appends) = spawn_store().await;
    let config = test_config(address);

    let inventory = MutableInventory::new(vec![eth0()]);
    let factory = ScriptedFactory::new(vec![(
        ("eth0", "tcp"),
        vec![vec![b'A'], vec![b'B'], vec![b'C'], vec![b'D']],
    )]);

    let shutdown = ShutdownSignal::new();
    let agent = tokio::spawn(run_agent(
        config,
        inventory,
        factory,
        shutdown.clone(),
        MetricsRecorder::new(),
    ));

    sleep(Duration::from_millis(300)).await;
    shutdown.trip();
    agent.await.unwrap().unwrap();

    let appends = appends.lock();
    let packet_batches: Vec<_> = appends.iter().filter(|a| a.kind == "packets").collect();
    assert_eq!(packet_batches.len(), 2, "one overflow flush plus the drain");
    assert_eq!(packet_batches[0].payload.as_array().unwrap().len(), 3);
    assert_eq!(packet_batches[1].payload.as_array().unwrap().len(), 1);
    assert!(appends.iter().all(|a| a.stream == "test-host"));

    // No loss, no duplication, insertion order preserved.
    assert_eq!(
        packet_payload_bytes(&appends),
        vec![vec![b'A'], vec![b'B'], vec![b'C'], vec![b'D']]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn periodic_flush_appends_empty_statistics_batch() {
    let (address, appends) = spawn_store().await;
    let mut config = test_config(address);
    // Stats sampling stays quiet; the periodic flush must still append.
    config.queue.stats_flush_interval_secs = 1;

    let inventory = MutableInventory::new(vec![eth0()]);
    let factory = ScriptedFactory::new(vec![(("eth0", "tcp"), vec![])]);

    let shutdown = ShutdownSignal::new();
    let agent = tokio::spawn(run_agent(
        config,
        inventory,
        factory,
        shutdown.clone(),
        MetricsRecorder::new(),
    ));

    sleep(Duration::from_millis(1400)).await;
    shutdown.trip();
    agent.await.unwrap().unwrap();

    let appends = appends.lock();
    let empty_stats = appends
        .iter()
        .filter(|a| a.kind == "stats" && a.payload == serde_json::json!([]))
        .count();
    assert!(empty_stats >= 1, "periodic flush must not skip on emptiness");
}

#[tokio::test(flavor = "multi_thread")]
async fn periodic_flush_failure_terminates_agent() {
    let address = spawn_dying_store().await;
    let mut config = test_config(address);
    config.queue.stats_flush_interval_secs = 1;

    let inventory = MutableInventory::new(vec![eth0()]);
    // Idle source: only the periodic statistics flush touches the sink.
    let factory = ScriptedFactory::new(vec![(("eth0", "tcp"), vec![])]);

    let agent = tokio::spawn(run_agent(
        config,
        inventory,
        factory,
        ShutdownSignal::new(),
        MetricsRecorder::new(),
    ));

    // The first flush at ~1s hits the dead connection; nobody trips
    // shutdown from the outside, the agent must stop on its own.
    let result = timeout(Duration::from_secs(5), agent).await;
    assert!(result.expect("agent kept running after a failed append")
        .unwrap()
        .is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn interface_resolution_waits_for_sink_connection() {
    // Reserve a port, then drop the listener so the first attempts fail.
    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = reserved.local_addr().unwrap().to_string();
    drop(reserved);

    let config = test_config(address.clone());
    let inventory = CountingInventory::new(vec![eth0()]);
    let factory = ScriptedFactory::new(vec![(("eth0", "tcp"), vec![])]);

    let shutdown = ShutdownSignal::new();
    let agent = tokio::spawn(run_agent(
        config,
        inventory.clone(),
        factory,
        shutdown.clone(),
        MetricsRecorder::new(),
    ));

    // While the store is down the inventory must stay untouched.
    sleep(Duration::from_millis(600)).await;
    assert_eq!(inventory.queries(), 0);

    let listener = TcpListener::bind(&address).await.unwrap();
    let _appends = spawn_store_on(listener);
    sleep(Duration::from_millis(2000)).await;
    assert!(inventory.queries() >= 1, "resolution after the connect");

    shutdown.trip();
    agent.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_drains_partial_queue() {
    let (address, appends) = spawn_store().await;
    let mut config = test_config(address);
    config.queue.max_queue_size = 10;

    let inventory = MutableInventory::new(vec![eth0()]);
    let factory = ScriptedFactory::new(vec![(("eth0", "tcp"), vec![vec![1], vec![2]])]);

    let shutdown = ShutdownSignal::new();
    let agent = tokio::spawn(run_agent(
        config,
        inventory,
        factory,
        shutdown.clone(),
        MetricsRecorder::new(),
    ));

    sleep(Duration::from_millis(200)).await;
    shutdown.trip();
    agent.await.unwrap().unwrap();

    let appends = appends.lock();
    assert_eq!(packet_payload_bytes(&appends), vec![vec![1], vec![2]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn secondary_capture_starts_once_address_appears() {
    let (address, appends) = spawn_store().await;
    let mut config = test_config(address);
    config.capture.secondary_adapter = "TAP".into();
    config.capture.secondary_address_prefix = "10.8.".into();

    let inventory = MutableInventory::new(vec![eth0()]);
    let factory = ScriptedFactory::new(vec![
        (("eth0", "tcp"), vec![vec![0x01]]),
        (("tun0", "tcp"), vec![vec![0x99]]),
    ]);

    let shutdown = ShutdownSignal::new();
    let agent = tokio::spawn(run_agent(
        config,
        inventory.clone(),
        factory,
        shutdown.clone(),
        MetricsRecorder::new(),
    ));

    // Tunnel comes up after the poller has already missed once.
    sleep(Duration::from_millis(200)).await;
    inventory.add(tun0());

    sleep(Duration::from_millis(1500)).await;
    shutdown.trip();
    agent.await.unwrap().unwrap();

    let appends = appends.lock();
    let mut bytes = packet_payload_bytes(&appends);
    bytes.sort();
    assert_eq!(bytes, vec![vec![0x01], vec![0x99]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn primary_only_when_secondary_never_appears() {
    let (address, appends) = spawn_store().await;
    let mut config = test_config(address);
    config.capture.secondary_adapter = "TAP".into();
    config.capture.secondary_address_prefix = "10.8.".into();

    let inventory = MutableInventory::new(vec![eth0()]);
    let factory = ScriptedFactory::new(vec![(("eth0", "tcp"), vec![vec![0x42]])]);

    let shutdown = ShutdownSignal::new();
    let agent = tokio::spawn(run_agent(
        config,
        inventory,
        factory,
        shutdown.clone(),
        MetricsRecorder::new(),
    ));

    sleep(Duration::from_millis(300)).await;
    shutdown.trip();
    // Not an error: the agent completes with primary capture only.
    agent.await.unwrap().unwrap();

    let appends = appends.lock();
    assert_eq!(packet_payload_bytes(&appends), vec![vec![0x42]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unresolved_primary_adapter_is_fatal() {
    let (address, _appends) = spawn_store().await;
    let config = test_config(address);

    let inventory = MutableInventory::new(vec![tun0()]);
    let factory = ScriptedFactory::new(vec![]);

    let result = run_agent(
        config,
        inventory,
        factory,
        ShutdownSignal::new(),
        MetricsRecorder::new(),
    )
    .await;
    assert!(result.is_err());
}
