//! # tillroll - Receipt Printing for Thermal Printers
//!
//! tillroll prints pharmacy and retail bills on ESC/POS thermal printers
//! over Bluetooth. It provides:
//!
//! - **Layout**: fixed-width receipt columns, GST summary, UPI payment QR
//! - **Protocol implementation**: ESC/POS command builders, including the
//!   `GS ( k` QR sub-protocol
//! - **Transport**: Bluetooth LE GATT and classic serial bridges, with
//!   chunked, strictly ordered writes
//!
//! ## Quick Start
//!
//! ```no_run
//! use tillroll::{
//!     document::ReceiptDocument,
//!     printer::{ConnectionType, PrintSettings, PrinterProfile},
//!     service::{PrintOutcome, PrintService},
//!     transport::TransportRegistry,
//! };
//!
//! # async fn example(bill: ReceiptDocument) -> Result<(), tillroll::PrintError> {
//! let settings = PrintSettings::default();
//! let registry = TransportRegistry::detect(&settings).await;
//! let service = PrintService::new(registry, settings);
//!
//! let profile = PrinterProfile {
//!     device_address: Some("66:22:B1:0C:3A:10".into()),
//!     ..PrinterProfile::thermal("counter", "Counter", ConnectionType::SerialBridge)
//! };
//!
//! match service.print_receipt(&bill, &profile).await? {
//!     PrintOutcome::Printed { bytes, .. } => println!("sent {bytes} bytes"),
//!     PrintOutcome::Cancelled => println!("cancelled"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Receipt input model |
//! | [`layout`] | Receipt layout into instructions |
//! | [`ir`] | Instruction programs and the byte encoder |
//! | [`protocol`] | ESC/POS command builders |
//! | [`transport`] | Discovery, sessions and chunked writes |
//! | [`service`] | `print_receipt` and `discover_devices` |
//! | [`printer`] | Printer profiles and settings |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod document;
pub mod error;
pub mod ir;
pub mod layout;
pub mod printer;
pub mod protocol;
pub mod server;
pub mod service;
pub mod transport;

// Re-exports for convenience
pub use error::{ConnectionError, PrintError, WriteError};
pub use printer::{PrintSettings, PrinterProfile};
pub use service::{PrintOutcome, PrintService};
