//! # Printer Module
//!
//! Printer profiles and print settings.
//!
//! ## Modules
//!
//! - [`profile`]: Which printer, and how it is reached
//! - [`config`]: Layout and transmission tunables

pub mod config;
pub mod profile;

pub use config::{KNOWN_PRINTER_SERVICES, PrintSettings};
pub use profile::{ConnectionType, PrinterFormat, PrinterProfile, default_profile};
