//! # Print Settings
//!
//! Tunables for layout and transmission, loaded from a JSON file. Every
//! field has a default so a partial (or empty) file is valid.
//!
//! ## Defaults
//!
//! | Setting | Default | Notes |
//! |---------|---------|-------|
//! | `paper_width` | 32 | characters; 48 for 80mm rolls |
//! | `chunk_size` | 20 | bytes per write; BLE ATT MTU 23 minus 3 |
//! | `chunk_delay_ms` | 0 | pause between chunks |
//! | `write_timeout_ms` | 5000 | deadline per chunk |
//! | `scan_timeout_secs` | 8 | discovery window |
//! | `require_known_service` | false | filter discovery to `known_services` |
//!
//! ```
//! use tillroll::printer::PrintSettings;
//!
//! let settings: PrintSettings = serde_json::from_str(r#"{"paper_width": 48}"#).unwrap();
//! assert_eq!(settings.paper_width, 48);
//! assert_eq!(settings.chunk_size, 20);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::layout::{MAX_WIDTH, MIN_WIDTH};

/// GATT services advertised by common thermal printers.
///
/// `18F0` is the vendor service on most 58/80mm ESC/POS printers; `FF00`
/// and `FFE0` are generic serial-over-GATT services; the last is the ISSC
/// transparent UART service.
pub const KNOWN_PRINTER_SERVICES: [Uuid; 4] = [
    Uuid::from_u128(0x000018f0_0000_1000_8000_00805f9b34fb),
    Uuid::from_u128(0x0000ff00_0000_1000_8000_00805f9b34fb),
    Uuid::from_u128(0x0000ffe0_0000_1000_8000_00805f9b34fb),
    Uuid::from_u128(0x49535343_fe7d_4ae5_8fa9_9fafd205e455),
];

fn default_paper_width() -> usize {
    crate::layout::DEFAULT_WIDTH
}

fn default_chunk_size() -> usize {
    20
}

fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_scan_timeout_secs() -> u64 {
    8
}

fn default_known_services() -> Vec<Uuid> {
    KNOWN_PRINTER_SERVICES.to_vec()
}

/// Layout and transmission settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Characters per line.
    #[serde(default = "default_paper_width")]
    pub paper_width: usize,

    /// Bytes per write.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub chunk_delay_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    /// Only offer devices advertising one of `known_services`.
    #[serde(default)]
    pub require_known_service: bool,

    #[serde(default = "default_known_services")]
    pub known_services: Vec<Uuid>,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            paper_width: default_paper_width(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: 0,
            write_timeout_ms: default_write_timeout_ms(),
            scan_timeout_secs: default_scan_timeout_secs(),
            require_known_service: false,
            known_services: default_known_services(),
        }
    }
}

impl PrintSettings {
    /// Read and validate settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let settings: Self = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the transport or layout cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&self.paper_width) {
            return Err(ConfigError::Invalid(format!(
                "paper_width must be between {} and {}, got {}",
                MIN_WIDTH, MAX_WIDTH, self.paper_width
            )));
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid("write_timeout_ms must be at least 1".into()));
        }
        if self.require_known_service && self.known_services.is_empty() {
            return Err(ConfigError::Invalid(
                "require_known_service is set but known_services is empty".into(),
            ));
        }
        Ok(())
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        let settings: PrintSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, PrintSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_known_service_short_form() {
        assert_eq!(
            KNOWN_PRINTER_SERVICES[0].to_string(),
            "000018f0-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let settings = PrintSettings {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_width() {
        for paper_width in [10, 80] {
            let settings = PrintSettings {
                paper_width,
                ..Default::default()
            };
            assert!(settings.validate().is_err());
        }
    }

    #[test]
    fn test_validate_service_filter_needs_services() {
        let settings = PrintSettings {
            require_known_service: true,
            known_services: vec![],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PrintSettings::load("/nonexistent/tillroll.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("tillroll-settings-{}.json", Uuid::new_v4()));
        std::fs::write(&path, r#"{"chunk_size": 180, "write_timeout_ms": 250}"#).unwrap();

        let settings = PrintSettings::load(&path).unwrap();
        assert_eq!(settings.chunk_size, 180);
        assert_eq!(settings.write_timeout(), Duration::from_millis(250));

        std::fs::remove_file(&path).unwrap();
    }
}
