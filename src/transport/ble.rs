//! # Bluetooth Low Energy Connection Manager
//!
//! Connects to a printer over GATT: the user picks a device, the manager
//! links to it, walks its services and keeps the first characteristic that
//! accepts writes.
//!
//! ## Connect Sequence
//!
//! ```text
//! lock ─► live session? ─yes─► reuse
//!               │no
//!               ▼
//!       request_device(filter)   (prompt; None = cancelled)
//!               ▼
//!       device.connect()         (link watch)
//!               ▼
//!       device.services()        first characteristic with
//!               ▼                write-without-response or write
//!       Session stored, returned
//! ```
//!
//! The lock is held for the whole sequence, so concurrent callers queue
//! behind the first and then reuse its session. Only one device prompt is
//! ever open.
//!
//! The platform side is abstracted by [`GattCentral`] and [`GattDevice`];
//! the `btleplug` backend implements them when the `ble` feature is on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ConnectionManager, DeviceDescriptor, Session, WriteCapabilities, WriteChannel};
use crate::error::ConnectionError;
use crate::printer::PrintSettings;

/// Which devices the picker offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    /// Advertised services that identify a printer.
    pub services: Vec<Uuid>,
    /// Offer devices that advertise none of `services`.
    pub accept_all: bool,
    /// How long to listen for advertisements.
    pub timeout: Duration,
}

impl ScanFilter {
    pub fn from_settings(settings: &PrintSettings) -> Self {
        Self {
            services: settings.known_services.clone(),
            accept_all: !settings.require_known_service,
            timeout: settings.scan_timeout(),
        }
    }

    /// Whether a device advertising `advertised` passes the filter.
    pub fn matches(&self, advertised: &[Uuid]) -> bool {
        self.accept_all || advertised.iter().any(|s| self.services.contains(s))
    }
}

/// GATT characteristic properties relevant to printing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharProperties {
    pub write: bool,
    pub write_without_response: bool,
}

impl CharProperties {
    pub fn writable(&self) -> bool {
        self.write || self.write_without_response
    }

    pub fn capabilities(&self) -> WriteCapabilities {
        WriteCapabilities {
            unacknowledged: self.write_without_response,
            acknowledged: self.write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    pub service: Uuid,
    pub properties: CharProperties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<GattCharacteristic>,
}

/// The first writable characteristic, in service then characteristic order.
pub fn select_writable(services: &[GattService]) -> Option<&GattCharacteristic> {
    services
        .iter()
        .flat_map(|s| s.characteristics.iter())
        .find(|c| c.properties.writable())
}

/// The platform's BLE central role.
#[async_trait]
pub trait GattCentral: Send + Sync {
    /// Let the user pick one device. `Ok(None)` means the user cancelled.
    async fn request_device(
        &self,
        filter: &ScanFilter,
    ) -> Result<Option<Arc<dyn GattDevice>>, ConnectionError>;

    /// Devices passing `filter`, without prompting.
    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<DeviceDescriptor>, ConnectionError>;
}

/// A discovered peripheral.
#[async_trait]
pub trait GattDevice: Send + Sync {
    fn descriptor(&self) -> DeviceDescriptor;

    /// Open the link. The returned watch turns false when the device drops it.
    async fn connect(&self) -> Result<watch::Receiver<bool>, ConnectionError>;

    /// Primary services with their characteristics.
    async fn services(&self) -> Result<Vec<GattService>, ConnectionError>;

    /// Write handle for one of this device's characteristics.
    fn channel(&self, characteristic: &GattCharacteristic) -> Arc<dyn WriteChannel>;

    async fn disconnect(&self) -> Result<(), ConnectionError>;
}

struct Live {
    session: Arc<Session>,
    device: Arc<dyn GattDevice>,
}

/// Owns at most one GATT session.
pub struct BleConnectionManager {
    central: Arc<dyn GattCentral>,
    filter: ScanFilter,
    live: Mutex<Option<Live>>,
}

impl BleConnectionManager {
    pub fn new(central: Arc<dyn GattCentral>, filter: ScanFilter) -> Self {
        Self {
            central,
            filter,
            live: Mutex::new(None),
        }
    }

    pub fn filter(&self) -> &ScanFilter {
        &self.filter
    }

    /// Return the live session or pair with a newly picked device.
    pub async fn connect(&self) -> Result<Arc<Session>, ConnectionError> {
        let mut live = self.live.lock().await;

        if let Some(current) = live.as_ref() {
            if current.session.is_connected() {
                debug!(session = %current.session.id(), "reusing BLE session");
                return Ok(current.session.clone());
            }
            info!(
                device = current.session.device().label(),
                "BLE link dropped, pairing again"
            );
            *live = None;
        }

        let device = self
            .central
            .request_device(&self.filter)
            .await?
            .ok_or(ConnectionError::UserCancelled)?;
        let descriptor = device.descriptor();
        info!(device = descriptor.label(), address = %descriptor.address, "connecting");

        let link = device.connect().await?;
        let services = match device.services().await {
            Ok(services) => services,
            Err(e) => {
                if let Err(close) = device.disconnect().await {
                    debug!(error = %close, "disconnect after failed setup");
                }
                return Err(e);
            }
        };

        let Some(characteristic) = select_writable(&services) else {
            warn!(
                device = descriptor.label(),
                services = services.len(),
                "no writable characteristic"
            );
            if let Err(e) = device.disconnect().await {
                debug!(error = %e, "disconnect after failed setup");
            }
            return Err(ConnectionError::NoWritableChannel(descriptor.label().to_string()));
        };
        debug!(
            service = %characteristic.service,
            characteristic = %characteristic.uuid,
            "selected write characteristic"
        );

        let channel = device.channel(characteristic);
        let session = Arc::new(Session::new(descriptor, channel, link));
        info!(session = %session.id(), "BLE session established");

        *live = Some(Live {
            session: session.clone(),
            device,
        });
        Ok(session)
    }

    /// Drop the session and close the link.
    pub async fn disconnect(&self) {
        let Some(current) = self.live.lock().await.take() else {
            return;
        };
        info!(session = %current.session.id(), "closing BLE session");
        current.session.close();
        if let Err(e) = current.device.disconnect().await {
            warn!(error = %e, "BLE disconnect failed");
        }
    }

    pub async fn current(&self) -> Option<Arc<Session>> {
        self.live
            .lock()
            .await
            .as_ref()
            .filter(|l| l.session.is_connected())
            .map(|l| l.session.clone())
    }

    pub async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        self.central.scan(&self.filter).await
    }
}

#[async_trait]
impl ConnectionManager for BleConnectionManager {
    async fn connect(&self, _address: Option<&str>) -> Result<Arc<Session>, ConnectionError> {
        BleConnectionManager::connect(self).await
    }

    async fn disconnect(&self) {
        BleConnectionManager::disconnect(self).await
    }

    async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        BleConnectionManager::discover(self).await
    }

    async fn current(&self) -> Option<Arc<Session>> {
        BleConnectionManager::current(self).await
    }
}


#[cfg(test)]
mod tests {
    use super::fake::*;
    use super::*;
    use pretty_assertions::assert_eq;

    fn manager(central: Arc<FakeCentral>) -> BleConnectionManager {
        BleConnectionManager::new(central, ScanFilter::from_settings(&PrintSettings::default()))
    }

    #[test]
    fn test_select_first_writable() {
        let services = printer_services();
        let selected = select_writable(&services).unwrap();
        assert_eq!(selected.uuid, Uuid::from_u128(0x2af1));
    }

    #[test]
    fn test_select_write_only_characteristic() {
        let services = vec![GattService {
            uuid: Uuid::from_u128(0xff00),
            characteristics: vec![
                characteristic(0xff01, 0xff00, CharProperties::default()),
                characteristic(
                    0xff02,
                    0xff00,
                    CharProperties {
                        write: true,
                        write_without_response: false,
                    },
                ),
            ],
        }];
        let selected = select_writable(&services).unwrap();
        assert_eq!(selected.uuid, Uuid::from_u128(0xff02));
        assert_eq!(
            selected.properties.capabilities(),
            WriteCapabilities {
                unacknowledged: false,
                acknowledged: true
            }
        );
    }

    #[test]
    fn test_filter_matching() {
        let known = Uuid::from_u128(0x18f0);
        let mut filter = ScanFilter {
            services: vec![known],
            accept_all: false,
            timeout: Duration::from_secs(1),
        };
        assert!(filter.matches(&[known]));
        assert!(!filter.matches(&[Uuid::from_u128(0x180f)]));
        assert!(!filter.matches(&[]));

        filter.accept_all = true;
        assert!(filter.matches(&[]));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let device = Arc::new(FakeDevice::new(printer_services()));
        let central = Arc::new(FakeCentral::with_device(device));
        let manager = manager(central.clone());

        let first = manager.connect().await.unwrap();
        let second = manager.connect().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(central.prompts(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_connects_share_one_prompt() {
        let device = Arc::new(FakeDevice::new(printer_services()));
        let mut central = FakeCentral::with_device(device);
        central.prompt_delay = Duration::from_millis(20);
        let central = Arc::new(central);
        let manager = Arc::new(manager(central.clone()));

        let a = tokio::spawn({
            let m = manager.clone();
            async move { m.connect().await }
        });
        let b = tokio::spawn({
            let m = manager.clone();
            async move { m.connect().await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(central.prompts(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_prompt() {
        let central = Arc::new(FakeCentral::cancelling());
        let manager = manager(central);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, ConnectionError::UserCancelled));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_no_writable_characteristic() {
        let device = Arc::new(FakeDevice::new(vec![GattService {
            uuid: Uuid::from_u128(0x180f),
            characteristics: vec![characteristic(0x2a19, 0x180f, CharProperties::default())],
        }]));
        let central = Arc::new(FakeCentral::with_device(device.clone()));
        let manager = manager(central);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, ConnectionError::NoWritableChannel(name) if name == "MPT-II"));
        assert_eq!(device.disconnects.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_device_disconnect_invalidates_session() {
        let device = Arc::new(FakeDevice::new(printer_services()));
        let central = Arc::new(FakeCentral::with_device(device.clone()));
        let manager = manager(central.clone());

        let first = manager.connect().await.unwrap();
        device.drop_link();
        assert!(!first.is_connected());
        assert!(manager.current().await.is_none());

        let second = manager.connect().await.unwrap();
        assert_ne!(first.id(), second.id());
        assert!(second.is_connected());
        assert_eq!(central.prompts(), 2);
    }

    #[tokio::test]
    async fn test_service_discovery_failure_closes_link() {
        let mut device = FakeDevice::new(printer_services());
        device.services_fail = true;
        let device = Arc::new(device);
        let manager = manager(Arc::new(FakeCentral::with_device(device.clone())));

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, ConnectionError::Backend(_)));
        assert_eq!(device.disconnects.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_explicit_disconnect() {
        let device = Arc::new(FakeDevice::new(printer_services()));
        let central = Arc::new(FakeCentral::with_device(device.clone()));
        let manager = manager(central);

        let held = manager.connect().await.unwrap();
        manager.disconnect().await;
        assert!(manager.current().await.is_none());
        assert_eq!(device.disconnects.load(std::sync::atomic::Ordering::SeqCst), 1);

        // The fake never reports the link going down; the held session is dead anyway
        assert!(!held.is_connected());
        let next = manager.connect().await.unwrap();
        assert_ne!(held.id(), next.id());
    }
}
