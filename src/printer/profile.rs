//! # Printer Profiles
//!
//! A profile names a printer and how to reach it. Profiles are created by
//! the pairing flow elsewhere; this crate only reads them.
//!
//! ```
//! use tillroll::printer::{ConnectionType, PrinterFormat, PrinterProfile};
//!
//! let profile: PrinterProfile = serde_json::from_str(r#"{
//!     "id": "counter-1",
//!     "name": "Counter",
//!     "format": "thermal",
//!     "connection_type": "serial_bridge",
//!     "device_address": "66:22:B1:0C:3A:10"
//! }"#).unwrap();
//!
//! assert_eq!(profile.format, PrinterFormat::Thermal);
//! assert_eq!(profile.connection_type, ConnectionType::SerialBridge);
//! assert!(!profile.is_default);
//! ```

use serde::{Deserialize, Serialize};

/// Page format the profile prints on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterFormat {
    /// Roll paper, fixed-width character columns.
    Thermal,
    A5,
    A4,
}

/// How the printer is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Bluetooth Low Energy GATT, driven by this process.
    DirectLowEnergy,
    /// Classic Bluetooth serial link owned by a platform bridge.
    SerialBridge,
    /// A separate printing app on the device.
    CompanionApp,
    /// The operating system's print dialog.
    SystemDialog,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::DirectLowEnergy => "direct_low_energy",
            ConnectionType::SerialBridge => "serial_bridge",
            ConnectionType::CompanionApp => "companion_app",
            ConnectionType::SystemDialog => "system_dialog",
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterProfile {
    pub id: String,
    pub name: String,
    pub format: PrinterFormat,

    #[serde(default)]
    pub is_default: bool,

    /// Visible to every user of the shop, not just its owner.
    #[serde(default)]
    pub is_shared: bool,

    pub connection_type: ConnectionType,

    /// Hardware address recorded at pairing time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl PrinterProfile {
    /// Thermal profile with no recorded device.
    pub fn thermal(
        id: impl Into<String>,
        name: impl Into<String>,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            format: PrinterFormat::Thermal,
            is_default: false,
            is_shared: false,
            connection_type,
            device_address: None,
            device_name: None,
        }
    }
}

/// A list with more than one default profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipleDefaults(pub Vec<String>);

impl std::fmt::Display for MultipleDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multiple default profiles: {}", self.0.join(", "))
    }
}

impl std::error::Error for MultipleDefaults {}

/// The owner's default profile, if any.
///
/// Fails listing the offending ids when more than one is flagged default.
pub fn default_profile(profiles: &[PrinterProfile]) -> Result<Option<&PrinterProfile>, MultipleDefaults> {
    let defaults: Vec<&PrinterProfile> = profiles.iter().filter(|p| p.is_default).collect();
    match defaults.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(one)),
        many => Err(MultipleDefaults(many.iter().map(|p| p.id.clone()).collect())),
    }
}
