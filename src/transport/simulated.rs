//! # Simulated Printers
//!
//! Stand-ins for machines with no Bluetooth stack: a fixed, clearly labeled
//! device list and a bridge that accepts those devices and discards what is
//! written to them.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::serial::{BridgeLink, SerialBridge};
use super::{DeviceDescriptor, LinkSender, WriteCapabilities, WriteChannel, link_watch};
use crate::error::ConnectionError;

/// The simulated device list. Always the same devices, in the same order.
pub fn simulated_devices() -> Vec<DeviceDescriptor> {
    [
        ("Simulated Printer 58mm", "00:00:00:00:58:01"),
        ("Simulated Printer 80mm", "00:00:00:00:80:01"),
    ]
    .into_iter()
    .map(|(name, address)| DeviceDescriptor {
        name: name.to_string(),
        address: address.to_string(),
        paired: true,
        simulated: true,
    })
    .collect()
}

/// Whether `address` belongs to a simulated device.
pub fn is_simulated_address(address: &str) -> bool {
    simulated_devices()
        .iter()
        .any(|d| d.address.eq_ignore_ascii_case(address))
}

/// Discards writes, counting them.
#[derive(Debug, Default)]
pub struct SimulatedChannel {
    writes: AtomicUsize,
    bytes: AtomicUsize,
}

impl SimulatedChannel {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    fn take(&self, data: &[u8]) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes.fetch_add(data.len(), Ordering::Relaxed) + data.len();
        tracing::trace!(len = data.len(), total, "simulated write");
    }
}

#[async_trait]
impl WriteChannel for SimulatedChannel {
    fn capabilities(&self) -> WriteCapabilities {
        WriteCapabilities {
            unacknowledged: true,
            acknowledged: true,
        }
    }

    async fn write_unacknowledged(&self, data: &[u8]) -> io::Result<()> {
        self.take(data);
        Ok(())
    }

    async fn write_acknowledged(&self, data: &[u8]) -> io::Result<()> {
        self.take(data);
        Ok(())
    }
}

/// Serial bridge serving the simulated devices.
#[derive(Default)]
pub struct SimulatedBridge {
    connected: AtomicBool,
    link: Mutex<Option<(LinkSender, Arc<SimulatedChannel>)>>,
}

impl SimulatedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel of the open session, for inspecting what was "printed".
    pub async fn channel(&self) -> Option<Arc<SimulatedChannel>> {
        self.link.lock().await.as_ref().map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl SerialBridge for SimulatedBridge {
    async fn paired_devices(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        Ok(simulated_devices())
    }

    async fn scan_devices(&self, _timeout: Duration) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        Ok(Vec::new())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn open(&self, address: &str) -> Result<BridgeLink, ConnectionError> {
        let device = simulated_devices()
            .into_iter()
            .find(|d| d.address.eq_ignore_ascii_case(address))
            .ok_or_else(|| ConnectionError::DeviceUnreachable(format!("{address} (simulated bridge)")))?;

        let (tx, rx) = link_watch();
        let channel = Arc::new(SimulatedChannel::default());
        *self.link.lock().await = Some((tx, channel.clone()));
        self.connected.store(true, Ordering::SeqCst);
        info!(device = %device.name, "simulated printer connected");

        Ok(BridgeLink {
            device,
            channel,
            link: rx,
        })
    }

    async fn close(&self) {
        if let Some((tx, channel)) = self.link.lock().await.take() {
            let _ = tx.send(false);
            info!(
                writes = channel.writes(),
                bytes = channel.bytes(),
                "simulated printer disconnected"
            );
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}
