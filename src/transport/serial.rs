//! # Serial-Bridge Connection Manager
//!
//! Classic Bluetooth printers speak SPP, a serial stream. This process does
//! not own that stream; a platform bridge does (on Linux, the kernel's
//! RFCOMM TTYs). The manager asks the bridge for a session and keeps it.
//!
//! ## Connect
//!
//! Under the manager's lock:
//!
//! 1. If the bridge reports an open session, reuse it. The bridge holds one
//!    link at a time, so the open session wins even when `address` names a
//!    different printer.
//! 2. Otherwise open a session to `address` and confirm with the bridge
//!    that it is connected before handing it out.
//!
//! ## Discovery
//!
//! Paired devices first, then newly scanned ones, deduplicated by address
//! (case-insensitive). A paired entry wins over a scanned duplicate.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::{ConnectionManager, DeviceDescriptor, Session, WriteChannel};
use crate::error::ConnectionError;

/// An opened bridge link.
pub struct BridgeLink {
    pub device: DeviceDescriptor,
    pub channel: Arc<dyn WriteChannel>,
    pub link: watch::Receiver<bool>,
}

impl std::fmt::Debug for BridgeLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeLink")
            .field("device", &self.device)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

/// Platform service owning classic Bluetooth serial links.
#[async_trait]
pub trait SerialBridge: Send + Sync {
    /// Devices bonded with this machine.
    async fn paired_devices(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError>;

    /// Devices found by an inquiry scan lasting `timeout`.
    async fn scan_devices(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, ConnectionError>;

    /// Whether the bridge currently holds an open link.
    async fn is_connected(&self) -> bool;

    async fn open(&self, address: &str) -> Result<BridgeLink, ConnectionError>;

    async fn close(&self);
}

/// Paired devices followed by unseen scanned devices.
pub fn merge_devices(
    paired: Vec<DeviceDescriptor>,
    scanned: Vec<DeviceDescriptor>,
) -> Vec<DeviceDescriptor> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(paired.len() + scanned.len());

    for device in paired {
        if seen.insert(device.address.to_ascii_uppercase()) {
            merged.push(DeviceDescriptor {
                paired: true,
                ..device
            });
        }
    }
    for device in scanned {
        if seen.insert(device.address.to_ascii_uppercase()) {
            merged.push(device);
        }
    }

    merged
}

/// Owns at most one bridge session.
pub struct SerialConnectionManager {
    bridge: Arc<dyn SerialBridge>,
    scan_timeout: Duration,
    session: Mutex<Option<Arc<Session>>>,
}

impl SerialConnectionManager {
    pub fn new(bridge: Arc<dyn SerialBridge>, scan_timeout: Duration) -> Self {
        Self {
            bridge,
            scan_timeout,
            session: Mutex::new(None),
        }
    }

    /// Return the open session or open one to `address`.
    pub async fn connect(&self, address: &str) -> Result<Arc<Session>, ConnectionError> {
        let mut slot = self.session.lock().await;

        if self.bridge.is_connected().await {
            if let Some(session) = slot.as_ref().filter(|s| s.is_connected()) {
                if !session.device().address.eq_ignore_ascii_case(address) {
                    debug!(
                        open = %session.device().address,
                        requested = address,
                        "bridge already holds a session, reusing it"
                    );
                }
                return Ok(session.clone());
            }
        }
        *slot = None;

        info!(address, "opening bridge session");
        let link = self.bridge.open(address).await?;
        if !self.bridge.is_connected().await {
            warn!(address, "bridge did not confirm the connection");
            return Err(ConnectionError::DeviceUnreachable(address.to_string()));
        }

        let session = Arc::new(Session::new(link.device, link.channel, link.link));
        info!(session = %session.id(), device = session.device().label(), "bridge session established");
        *slot = Some(session.clone());
        Ok(session)
    }

    pub async fn disconnect(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        info!(session = %session.id(), "closing bridge session");
        session.close();
        self.bridge.close().await;
    }

    pub async fn current(&self) -> Option<Arc<Session>> {
        self.session
            .lock()
            .await
            .as_ref()
            .filter(|s| s.is_connected())
            .cloned()
    }

    /// Paired and scanned devices, merged.
    ///
    /// A failed scan still returns the paired list.
    pub async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        let paired = self.bridge.paired_devices().await?;
        let scanned = match self.bridge.scan_devices(self.scan_timeout).await {
            Ok(scanned) => scanned,
            Err(e) => {
                warn!(error = %e, "scan failed, listing paired devices only");
                Vec::new()
            }
        };
        let merged = merge_devices(paired, scanned);
        debug!(count = merged.len(), "serial discovery complete");
        Ok(merged)
    }
}

#[async_trait]
impl ConnectionManager for SerialConnectionManager {
    async fn connect(&self, address: Option<&str>) -> Result<Arc<Session>, ConnectionError> {
        let address = address.ok_or_else(|| {
            ConnectionError::DeviceUnreachable("no device address on the profile".into())
        })?;
        SerialConnectionManager::connect(self, address).await
    }

    async fn disconnect(&self) {
        SerialConnectionManager::disconnect(self).await
    }

    async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        SerialConnectionManager::discover(self).await
    }

    async fn current(&self) -> Option<Arc<Session>> {
        SerialConnectionManager::current(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingChannel;
    use crate::transport::{LinkSender, link_watch};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeBridge {
        connected: AtomicBool,
        confirm: bool,
        opens: AtomicUsize,
        links: StdMutex<Vec<LinkSender>>,
        scan_fails: bool,
        open_delay: Duration,
    }

    impl FakeBridge {
        fn new() -> Self {
            Self {
                connected: AtomicBool::new(false),
                confirm: true,
                opens: AtomicUsize::new(0),
                links: StdMutex::new(Vec::new()),
                scan_fails: false,
                open_delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl SerialBridge for FakeBridge {
        async fn paired_devices(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
            Ok(vec![
                DeviceDescriptor::new("RPP02N", "66:22:b1:0c:3a:10"),
                DeviceDescriptor::new("Counter", "11:22:33:44:55:66"),
            ])
        }

        async fn scan_devices(
            &self,
            _timeout: Duration,
        ) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
            if self.scan_fails {
                return Err(ConnectionError::Backend("inquiry failed".into()));
            }
            Ok(vec![
                DeviceDescriptor::new("RPP02N (scan)", "66:22:B1:0C:3A:10"),
                DeviceDescriptor::new("MTP-3", "AA:BB:CC:00:00:01"),
            ])
        }

        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn open(&self, address: &str) -> Result<BridgeLink, ConnectionError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if !self.open_delay.is_zero() {
                tokio::time::sleep(self.open_delay).await;
            }
            self.connected.store(self.confirm, Ordering::SeqCst);
            let (tx, rx) = link_watch();
            self.links.lock().unwrap().push(tx);
            Ok(BridgeLink {
                device: DeviceDescriptor::new("Printer", address).paired(),
                channel: Arc::new(RecordingChannel::both()),
                link: rx,
            })
        }

        async fn close(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    fn manager(bridge: Arc<FakeBridge>) -> SerialConnectionManager {
        SerialConnectionManager::new(bridge, Duration::from_millis(10))
    }

    #[test]
    fn test_merge_prefers_paired() {
        let merged = merge_devices(
            vec![DeviceDescriptor::new("A", "aa:00:00:00:00:01")],
            vec![
                DeviceDescriptor::new("A scanned", "AA:00:00:00:00:01"),
                DeviceDescriptor::new("B", "AA:00:00:00:00:02"),
                DeviceDescriptor::new("B again", "aa:00:00:00:00:02"),
            ],
        );
        let names: Vec<&str> = merged.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(merged[0].paired);
        assert!(!merged[1].paired);
    }

    #[tokio::test]
    async fn test_discover_merges() {
        let manager = manager(Arc::new(FakeBridge::new()));
        let devices = manager.discover().await.unwrap();
        let addresses: Vec<&str> = devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["66:22:b1:0c:3a:10", "11:22:33:44:55:66", "AA:BB:CC:00:00:01"]
        );
    }

    #[tokio::test]
    async fn test_discover_survives_scan_failure() {
        let mut bridge = FakeBridge::new();
        bridge.scan_fails = true;
        let devices = manager(Arc::new(bridge)).discover().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| d.paired));
    }

    #[tokio::test]
    async fn test_connect_reuses_open_session() {
        let bridge = Arc::new(FakeBridge::new());
        let manager = manager(bridge.clone());

        let first = manager.connect("66:22:B1:0C:3A:10").await.unwrap();
        let second = manager.connect("66:22:B1:0C:3A:10").await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(bridge.opens.load(Ordering::SeqCst), 1);

        // The bridge holds one link; another address still gets it
        let third = manager.connect("11:22:33:44:55:66").await.unwrap();
        assert_eq!(first.id(), third.id());
    }

    #[tokio::test]
    async fn test_unconfirmed_open_fails() {
        let mut bridge = FakeBridge::new();
        bridge.confirm = false;
        let manager = manager(Arc::new(bridge));

        let err = manager.connect("66:22:B1:0C:3A:10").await.unwrap_err();
        assert!(matches!(err, ConnectionError::DeviceUnreachable(_)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_reopens_after_link_loss() {
        let bridge = Arc::new(FakeBridge::new());
        let manager = manager(bridge.clone());

        let first = manager.connect("66:22:B1:0C:3A:10").await.unwrap();
        for tx in bridge.links.lock().unwrap().iter() {
            tx.send(false).unwrap();
        }

        let second = manager.connect("66:22:B1:0C:3A:10").await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(bridge.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_trait_connect_needs_address() {
        let manager = manager(Arc::new(FakeBridge::new()));
        let err = ConnectionManager::connect(&manager, None).await.unwrap_err();
        assert!(matches!(err, ConnectionError::DeviceUnreachable(_)));
    }

    #[tokio::test]
    async fn test_disconnect_closes_bridge() {
        let bridge = Arc::new(FakeBridge::new());
        let manager = manager(bridge.clone());
        let held = manager.connect("66:22:B1:0C:3A:10").await.unwrap();

        manager.disconnect().await;
        assert!(!bridge.connected.load(Ordering::SeqCst));
        assert!(manager.current().await.is_none());
        assert!(!held.is_connected());
    }

    #[tokio::test]
    async fn test_concurrent_connects_open_once() {
        let mut bridge = FakeBridge::new();
        bridge.open_delay = Duration::from_millis(50);
        let bridge = Arc::new(bridge);
        let manager = Arc::new(manager(bridge.clone()));

        let a = tokio::spawn({
            let manager = manager.clone();
            async move { manager.connect("66:22:B1:0C:3A:10").await }
        });
        let b = tokio::spawn({
            let manager = manager.clone();
            async move { manager.connect("66:22:B1:0C:3A:10").await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(bridge.opens.load(Ordering::SeqCst), 1);
    }
}
