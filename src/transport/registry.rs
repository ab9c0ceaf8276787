//! # Transport Registry
//!
//! Which [`ConnectionManager`] serves which [`ConnectionType`], decided once
//! at startup. Printing looks the manager up; it never probes the platform.
//!
//! | Connection type | Installed by [`TransportRegistry::detect`] |
//! |-----------------|---------------------------------------------|
//! | `serial_bridge` | BlueZ RFCOMM bridge, else the simulated bridge |
//! | `direct_low_energy` | btleplug central (feature `ble`) when an adapter exists |
//! | `companion_app`, `system_dialog` | nothing |

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{info, warn};

use super::serial::SerialBridge;
use super::simulated::{SimulatedBridge, simulated_devices};
use super::{ConnectionManager, DeviceDescriptor, SerialConnectionManager, TransportVariant};
use crate::error::ConnectionError;
use crate::printer::{ConnectionType, PrintSettings};

/// Managers keyed by connection type.
#[derive(Default, Clone)]
pub struct TransportRegistry {
    managers: HashMap<ConnectionType, Arc<dyn ConnectionManager>>,
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.managers.keys()).finish()
    }
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `manager` for `connection_type`, replacing any previous one.
    pub fn with(
        mut self,
        connection_type: ConnectionType,
        manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        self.managers.insert(connection_type, manager);
        self
    }

    pub fn get(&self, connection_type: ConnectionType) -> Option<Arc<dyn ConnectionManager>> {
        self.managers.get(&connection_type).cloned()
    }

    pub fn supports(&self, connection_type: ConnectionType) -> bool {
        self.managers.contains_key(&connection_type)
    }

    /// Registry with only the simulated serial bridge.
    pub fn simulated(settings: &PrintSettings) -> Self {
        Self::new().with(
            ConnectionType::SerialBridge,
            Arc::new(SerialConnectionManager::new(
                Arc::new(SimulatedBridge::new()),
                settings.scan_timeout(),
            )),
        )
    }

    /// Probe the platform once and install what it supports.
    pub async fn detect(settings: &PrintSettings) -> Self {
        let bridge: Arc<dyn SerialBridge> = match super::rfcomm::RfcommBridge::detect().await {
            Some(bridge) => Arc::new(bridge),
            None => {
                info!("no serial bridge available, using simulated printers");
                Arc::new(SimulatedBridge::new())
            }
        };
        let registry = Self::new().with(
            ConnectionType::SerialBridge,
            Arc::new(SerialConnectionManager::new(bridge, settings.scan_timeout())),
        );

        Self::detect_low_energy(registry, settings).await
    }

    #[cfg(feature = "ble")]
    async fn detect_low_energy(registry: Self, settings: &PrintSettings) -> Self {
        use super::ble::{BleConnectionManager, ScanFilter};
        use super::btle::BtleCentral;

        match BtleCentral::open().await {
            Ok(central) => registry.with(
                ConnectionType::DirectLowEnergy,
                Arc::new(BleConnectionManager::new(
                    Arc::new(central),
                    ScanFilter::from_settings(settings),
                )),
            ),
            Err(e) => {
                warn!(error = %e, "Bluetooth LE unavailable");
                registry
            }
        }
    }

    #[cfg(not(feature = "ble"))]
    async fn detect_low_energy(registry: Self, _settings: &PrintSettings) -> Self {
        info!("built without the ble feature, Bluetooth LE printing disabled");
        registry
    }

    /// A lazy device scan for `variant`.
    pub fn scan(&self, variant: TransportVariant) -> DeviceScan {
        DeviceScan::new(self.get(variant.connection_type()))
    }
}

/// Devices found by one discovery run.
///
/// Nothing is scanned until the first [`next`](Self::next); the scan then
/// runs to completion and its results are yielded in order. A manager that
/// reports [`ConnectionError::UnsupportedTransport`], or no manager at all,
/// yields the simulated device list instead. Other failures end the scan
/// early and are kept in [`error`](Self::error).
pub struct DeviceScan {
    manager: Option<Arc<dyn ConnectionManager>>,
    state: ScanState,
    error: Option<ConnectionError>,
}

enum ScanState {
    Pending,
    Yielding(VecDeque<DeviceDescriptor>),
}

impl DeviceScan {
    pub fn new(manager: Option<Arc<dyn ConnectionManager>>) -> Self {
        Self {
            manager,
            state: ScanState::Pending,
            error: None,
        }
    }

    /// The next device, or `None` once the scan is exhausted.
    pub async fn next(&mut self) -> Option<DeviceDescriptor> {
        if let ScanState::Pending = self.state {
            let devices = self.run().await;
            self.state = ScanState::Yielding(devices.into());
        }
        match &mut self.state {
            ScanState::Yielding(queue) => queue.pop_front(),
            ScanState::Pending => None,
        }
    }

    /// Drain the scan into a list.
    pub async fn collect(mut self) -> Vec<DeviceDescriptor> {
        let mut devices = Vec::new();
        while let Some(device) = self.next().await {
            devices.push(device);
        }
        devices
    }

    /// The failure that ended the scan early, if any.
    pub fn error(&self) -> Option<&ConnectionError> {
        self.error.as_ref()
    }

    async fn run(&mut self) -> Vec<DeviceDescriptor> {
        let Some(manager) = &self.manager else {
            return simulated_devices();
        };
        match manager.discover().await {
            Ok(devices) => devices,
            Err(ConnectionError::UnsupportedTransport(reason)) => {
                info!(%reason, "transport unsupported, listing simulated printers");
                simulated_devices()
            }
            Err(e) => {
                warn!(error = %e, "device discovery failed");
                self.error = Some(e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Session;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingManager {
        discovers: AtomicUsize,
        result: fn() -> Result<Vec<DeviceDescriptor>, ConnectionError>,
    }

    #[async_trait]
    impl ConnectionManager for CountingManager {
        async fn connect(&self, _address: Option<&str>) -> Result<Arc<Session>, ConnectionError> {
            Err(ConnectionError::UnsupportedTransport("test".into()))
        }

        async fn disconnect(&self) {}

        async fn discover(&self) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
            self.discovers.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        async fn current(&self) -> Option<Arc<Session>> {
            None
        }
    }

    fn counting(
        result: fn() -> Result<Vec<DeviceDescriptor>, ConnectionError>,
    ) -> Arc<CountingManager> {
        Arc::new(CountingManager {
            discovers: AtomicUsize::new(0),
            result,
        })
    }

    fn two_devices() -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        Ok(vec![
            DeviceDescriptor::new("A", "00:00:00:00:00:0A"),
            DeviceDescriptor::new("B", "00:00:00:00:00:0B"),
        ])
    }

    #[tokio::test]
    async fn test_scan_is_lazy_and_finite() {
        let manager = counting(two_devices);
        let mut scan = DeviceScan::new(Some(manager.clone()));
        assert_eq!(manager.discovers.load(Ordering::SeqCst), 0);

        assert_eq!(scan.next().await.unwrap().name, "A");
        assert_eq!(scan.next().await.unwrap().name, "B");
        assert_eq!(scan.next().await, None);
        assert_eq!(scan.next().await, None);
        assert_eq!(manager.discovers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_new_scan_restarts_discovery() {
        let manager = counting(two_devices);
        let registry = TransportRegistry::new().with(ConnectionType::SerialBridge, manager.clone());

        assert_eq!(registry.scan(TransportVariant::SerialBridge).collect().await.len(), 2);
        assert_eq!(registry.scan(TransportVariant::SerialBridge).collect().await.len(), 2);
        assert_eq!(manager.discovers.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_transport_falls_back_to_simulated() {
        let registry = TransportRegistry::new();
        let first = registry.scan(TransportVariant::LowEnergy).collect().await;
        let second = registry.scan(TransportVariant::LowEnergy).collect().await;
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert!(first.iter().all(|d| d.simulated));
    }

    #[tokio::test]
    async fn test_unsupported_falls_back_to_simulated() {
        let manager = counting(|| Err(ConnectionError::UnsupportedTransport("no adapter".into())));
        let devices = DeviceScan::new(Some(manager)).collect().await;
        assert_eq!(devices, simulated_devices());
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let manager = counting(|| Err(ConnectionError::Backend("adapter busy".into())));
        let mut scan = DeviceScan::new(Some(manager));
        assert_eq!(scan.next().await, None);
        assert!(matches!(scan.error(), Some(ConnectionError::Backend(_))));
    }

    #[tokio::test]
    async fn test_simulated_registry() {
        let registry = TransportRegistry::simulated(&PrintSettings::default());
        assert!(registry.supports(ConnectionType::SerialBridge));
        assert!(!registry.supports(ConnectionType::CompanionApp));

        let devices = registry.scan(TransportVariant::SerialBridge).collect().await;
        assert_eq!(devices, simulated_devices());
    }
}
