//! # btleplug GATT Backend
//!
//! [`GattCentral`] and [`GattDevice`] over `btleplug`, which wraps BlueZ
//! (Linux), CoreBluetooth (macOS) and WinRT (Windows).
//!
//! ## Device Picker
//!
//! There is no system chooser on a terminal, so the picker scans for
//! `scan_timeout`, then:
//!
//! - no candidates: fails with `DeviceUnreachable`
//! - one candidate: picks it
//! - several: lists them on stderr and reads a number from stdin; an empty
//!   line or `q` cancels
//!
//! ## Disconnects
//!
//! A task per connected device watches the adapter's event stream and flips
//! the session's link watch on `DeviceDisconnected`.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter as AdapterFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::ble::{
    CharProperties, GattCentral, GattCharacteristic, GattDevice, GattService, ScanFilter,
};
use super::{DeviceDescriptor, WriteCapabilities, WriteChannel, link_watch};
use crate::error::ConnectionError;

fn backend(e: btleplug::Error) -> ConnectionError {
    ConnectionError::Backend(e.to_string())
}

/// The first Bluetooth adapter on this machine.
pub struct BtleCentral {
    adapter: Adapter,
}

impl BtleCentral {
    /// Open the first adapter.
    ///
    /// Fails with `UnsupportedTransport` when the platform has no adapter.
    pub async fn open() -> Result<Self, ConnectionError> {
        let manager = Manager::new().await.map_err(backend)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(backend)?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectionError::UnsupportedTransport("no Bluetooth adapter".into()))?;

        if let Ok(info) = adapter.adapter_info().await {
            info!(adapter = %info, "Bluetooth adapter ready");
        }
        Ok(Self { adapter })
    }

    /// Scan for `filter.timeout` and return matching peripherals.
    async fn candidates(
        &self,
        filter: &ScanFilter,
    ) -> Result<Vec<(DeviceDescriptor, Peripheral)>, ConnectionError> {
        let services = if filter.accept_all {
            Vec::new()
        } else {
            filter.services.clone()
        };

        self.adapter
            .start_scan(AdapterFilter { services })
            .await
            .map_err(backend)?;
        tokio::time::sleep(filter.timeout).await;
        if let Err(e) = self.adapter.stop_scan().await {
            debug!(error = %e, "stop_scan failed");
        }

        let mut found = Vec::new();
        for peripheral in self.adapter.peripherals().await.map_err(backend)? {
            let Some(props) = peripheral.properties().await.map_err(backend)? else {
                continue;
            };
            if !filter.matches(&props.services) {
                continue;
            }
            let descriptor = DeviceDescriptor::new(
                props.local_name.unwrap_or_default(),
                peripheral.address().to_string(),
            );
            found.push((descriptor, peripheral));
        }

        debug!(count = found.len(), "scan complete");
        Ok(found)
    }
}

#[async_trait]
impl GattCentral for BtleCentral {
    async fn request_device(
        &self,
        filter: &ScanFilter,
    ) -> Result<Option<Arc<dyn GattDevice>>, ConnectionError> {
        let mut found = self.candidates(filter).await?;

        let index = match found.len() {
            0 => {
                return Err(ConnectionError::DeviceUnreachable(
                    "no printer found nearby".into(),
                ));
            }
            1 => 0,
            _ => {
                let names: Vec<DeviceDescriptor> = found.iter().map(|(d, _)| d.clone()).collect();
                let picked = tokio::task::spawn_blocking(move || prompt(&names))
                    .await
                    .map_err(|e| ConnectionError::Backend(e.to_string()))??;
                match picked {
                    Some(index) => index,
                    None => return Ok(None),
                }
            }
        };

        let (descriptor, peripheral) = found.swap_remove(index);
        Ok(Some(Arc::new(BtleDevice {
            adapter: self.adapter.clone(),
            peripheral,
            descriptor,
        })))
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<DeviceDescriptor>, ConnectionError> {
        Ok(self
            .candidates(filter)
            .await?
            .into_iter()
            .map(|(d, _)| d)
            .collect())
    }
}

/// List candidates on stderr and read a choice from stdin.
fn prompt(candidates: &[DeviceDescriptor]) -> Result<Option<usize>, ConnectionError> {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "Select a printer:")?;
    for (i, device) in candidates.iter().enumerate() {
        writeln!(stderr, "  {}) {} [{}]", i + 1, device.label(), device.address)?;
    }

    let mut line = String::new();
    loop {
        write!(stderr, "Number (empty or q to cancel): ")?;
        stderr.flush()?;
        line.clear();
        io::stdin().lock().read_line(&mut line)?;
        match parse_choice(&line, candidates.len()) {
            Choice::Cancel => return Ok(None),
            Choice::Pick(index) => return Ok(Some(index)),
            Choice::Invalid => writeln!(stderr, "Enter 1-{}", candidates.len())?,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Cancel,
    Pick(usize),
    Invalid,
}

fn parse_choice(line: &str, count: usize) -> Choice {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("q") {
        return Choice::Cancel;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Choice::Pick(n - 1),
        _ => Choice::Invalid,
    }
}

fn properties(flags: CharPropFlags) -> CharProperties {
    CharProperties {
        write: flags.contains(CharPropFlags::WRITE),
        write_without_response: flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
    }
}

struct BtleDevice {
    adapter: Adapter,
    peripheral: Peripheral,
    descriptor: DeviceDescriptor,
}

#[async_trait]
impl GattDevice for BtleDevice {
    fn descriptor(&self) -> DeviceDescriptor {
        self.descriptor.clone()
    }

    async fn connect(&self) -> Result<watch::Receiver<bool>, ConnectionError> {
        let events = self.adapter.events().await.map_err(backend)?;
        self.peripheral
            .connect()
            .await
            .map_err(|e| ConnectionError::DeviceUnreachable(e.to_string()))?;

        let (tx, rx) = link_watch();
        let id = self.peripheral.id();
        let label = self.descriptor.label().to_string();
        tokio::spawn(async move {
            let mut events = events;
            while let Some(event) = events.next().await {
                if tx.is_closed() {
                    break;
                }
                if let CentralEvent::DeviceDisconnected(gone) = event {
                    if gone == id {
                        info!(device = %label, "printer dropped the link");
                        let _ = tx.send(false);
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn services(&self) -> Result<Vec<GattService>, ConnectionError> {
        self.peripheral.discover_services().await.map_err(backend)?;
        Ok(self
            .peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|c| GattCharacteristic {
                        uuid: c.uuid,
                        service: c.service_uuid,
                        properties: properties(c.properties),
                    })
                    .collect(),
            })
            .collect())
    }

    fn channel(&self, characteristic: &GattCharacteristic) -> Arc<dyn WriteChannel> {
        let found = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic.uuid && c.service_uuid == characteristic.service);
        if found.is_none() {
            warn!(characteristic = %characteristic.uuid, "characteristic vanished after discovery");
        }
        Arc::new(BtleChannel {
            peripheral: self.peripheral.clone(),
            characteristic: found,
        })
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.peripheral.disconnect().await.map_err(backend)
    }
}

struct BtleChannel {
    peripheral: Peripheral,
    characteristic: Option<Characteristic>,
}

impl BtleChannel {
    async fn write(&self, data: &[u8], kind: WriteType) -> io::Result<()> {
        let characteristic = self
            .characteristic
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no write characteristic"))?;
        self.peripheral
            .write(characteristic, data, kind)
            .await
            .map_err(io::Error::other)
    }
}

#[async_trait]
impl WriteChannel for BtleChannel {
    fn capabilities(&self) -> WriteCapabilities {
        self.characteristic
            .as_ref()
            .map(|c| properties(c.properties).capabilities())
            .unwrap_or_default()
    }

    async fn write_unacknowledged(&self, data: &[u8]) -> io::Result<()> {
        self.write(data, WriteType::WithoutResponse).await
    }

    async fn write_acknowledged(&self, data: &[u8]) -> io::Result<()> {
        self.write(data, WriteType::WithResponse).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("\n", 3), Choice::Cancel);
        assert_eq!(parse_choice("Q\n", 3), Choice::Cancel);
        assert_eq!(parse_choice("2\n", 3), Choice::Pick(1));
        assert_eq!(parse_choice("0", 3), Choice::Invalid);
        assert_eq!(parse_choice("4", 3), Choice::Invalid);
        assert_eq!(parse_choice("two", 3), Choice::Invalid);
    }

    #[test]
    fn test_flag_mapping() {
        let props = properties(CharPropFlags::WRITE_WITHOUT_RESPONSE | CharPropFlags::NOTIFY);
        assert!(props.write_without_response);
        assert!(!props.write);
        assert!(!properties(CharPropFlags::READ).writable());
    }
}
