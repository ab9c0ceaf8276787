//! # Printer Transport Layer
//!
//! Getting bytes to a printer: finding it, holding one session to it, and
//! writing a frame in chunks it can absorb.
//!
//! ## Available Transports
//!
//! - [`ble`]: Bluetooth Low Energy GATT, driven through a [`ble::GattCentral`]
//! - [`serial`]: classic Bluetooth serial links owned by a [`serial::SerialBridge`]
//! - `btle`: the `btleplug` GATT backend (feature `ble`)
//! - [`rfcomm`]: the Linux serial bridge (`/dev/rfcommN` + `bluetoothctl`)
//! - [`simulated`]: a stand-in bridge for machines without Bluetooth
//!
//! ## Sessions
//!
//! A manager hands out one [`Session`] at a time as `Arc<Session>`. The
//! session carries a link-state watch; once the device drops the link,
//! [`Session::is_connected`] turns false and the manager's next `connect`
//! pairs again.
//!
//! ```text
//! connect() ──► Session { device, channel, link: watch<bool> }
//!                               │
//!                  writer::send(frame, session, options)
//! ```

pub mod ble;
#[cfg(feature = "ble")]
pub mod btle;
pub mod registry;
pub mod rfcomm;
pub mod serial;
pub mod simulated;
pub mod writer;

pub use ble::BleConnectionManager;
pub use registry::{DeviceScan, TransportRegistry};
pub use serial::SerialConnectionManager;
pub use writer::{SendReport, WriteOptions};

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::ConnectionError;
use crate::printer::ConnectionType;

/// Write modes a channel supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCapabilities {
    /// Fire-and-forget writes (GATT write without response).
    pub unacknowledged: bool,
    /// Writes confirmed by the device.
    pub acknowledged: bool,
}

impl WriteCapabilities {
    pub fn any(&self) -> bool {
        self.unacknowledged || self.acknowledged
    }
}

/// A writable endpoint on a connected device.
#[async_trait]
pub trait WriteChannel: Send + Sync {
    fn capabilities(&self) -> WriteCapabilities;

    async fn write_unacknowledged(&self, data: &[u8]) -> io::Result<()>;

    /// Resolves once the device confirms the write.
    async fn write_acknowledged(&self, data: &[u8]) -> io::Result<()>;
}

/// A printer as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub paired: bool,
    /// Not a real device; see [`simulated`].
    #[serde(default)]
    pub simulated: bool,
}

impl DeviceDescriptor {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            paired: false,
            simulated: false,
        }
    }

    pub fn paired(mut self) -> Self {
        self.paired = true;
        self
    }

    /// Name for log lines; falls back to the address.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}

/// Sender half of a link-state watch, owned by whoever observes the link.
pub type LinkSender = watch::Sender<bool>;

/// Link watch starting in the connected state.
pub fn link_watch() -> (LinkSender, watch::Receiver<bool>) {
    watch::channel(true)
}

/// One live connection to a printer.
pub struct Session {
    id: Uuid,
    device: DeviceDescriptor,
    channel: Arc<dyn WriteChannel>,
    link: watch::Receiver<bool>,
    closed: watch::Sender<bool>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("device", &self.device)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Session {
    pub fn new(
        device: DeviceDescriptor,
        channel: Arc<dyn WriteChannel>,
        link: watch::Receiver<bool>,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            device,
            channel,
            link,
            closed,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn channel(&self) -> &Arc<dyn WriteChannel> {
        &self.channel
    }

    /// False once the device dropped the link or the session was closed.
    ///
    /// A watch whose sender is gone counts as disconnected.
    pub fn is_connected(&self) -> bool {
        !*self.closed.borrow() && *self.link.borrow() && self.link.has_changed().is_ok()
    }

    /// Mark the session dead, whatever the backend reports.
    ///
    /// Holders of this session see [`is_connected`](Self::is_connected)
    /// turn false and [`disconnected`](Self::disconnected) resolve.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Resolves when the link goes down or the session is closed.
    pub async fn disconnected(&self) {
        let mut link = self.link.clone();
        let mut closed = self.closed.subscribe();
        // Err means the sender is gone, which is a disconnect as well
        tokio::select! {
            _ = link.wait_for(|up| !*up) => {}
            _ = closed.wait_for(|c| *c) => {}
        }
    }
}

/// Which family of managers to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TransportVariant {
    /// Bluetooth Low Energy GATT.
    LowEnergy,
    /// Classic Bluetooth via a serial bridge.
    SerialBridge,
}

impl TransportVariant {
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            TransportVariant::LowEnergy => ConnectionType::DirectLowEnergy,
            TransportVariant::SerialBridge => ConnectionType::SerialBridge,
        }
    }
}

/// Discovery and session ownership for one transport.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Return the live session, establishing one if needed.
    ///
    /// `address` is the device recorded on the profile; managers that pick
    /// devices interactively ignore it.
    async fn connect(&self, address: Option<&str>) -> Result<Arc<Session>, ConnectionError>;

    /// Tear down the current session, if any.
    async fn disconnect(&self);

    /// Devices currently reachable, in display order.
    async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError>;

    /// The live session, without connecting.
    async fn current(&self) -> Option<Arc<Session>>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use testing::RecordingChannel;

    fn session() -> (LinkSender, Session) {
        let (tx, rx) = link_watch();
        let session = Session::new(
            DeviceDescriptor::new("Printer", "AA:BB:CC:DD:EE:FF"),
            Arc::new(RecordingChannel::both()),
            rx,
        );
        (tx, session)
    }

    #[test]
    fn test_session_follows_link() {
        let (tx, session) = session();
        assert!(session.is_connected());
        tx.send(false).unwrap();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_dropped_sender_is_disconnect() {
        let (tx, session) = session();
        drop(tx);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_disconnected_resolves() {
        let (tx, session) = session();
        tokio::spawn(async move {
            tx.send(false).unwrap();
        });
        session.disconnected().await;
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_close_ends_session() {
        let (_tx, session) = session();
        session.close();
        assert!(!session.is_connected());
        session.disconnected().await;
    }

    #[test]
    fn test_descriptor_label() {
        assert_eq!(DeviceDescriptor::new("", "AA").label(), "AA");
        assert_eq!(DeviceDescriptor::new("MTP-II", "AA").label(), "MTP-II");
    }

    #[test]
    fn test_variant_names() {
        let v: TransportVariant = serde_json::from_str("\"serial-bridge\"").unwrap();
        assert_eq!(v, TransportVariant::SerialBridge);
        assert_eq!(
            TransportVariant::LowEnergy.connection_type(),
            ConnectionType::DirectLowEnergy
        );
    }
}
