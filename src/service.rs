//! # Print Service
//!
//! The entry points the billing side calls: print a receipt on a profile's
//! printer, and list printers for the pairing flow.
//!
//! ## Print Pipeline
//!
//! ```text
//! profile.connection_type ─► registry ─► manager.connect()  ─► Session
//! document ─► ReceiptLayout::render ─► optimize ─► encode  ─► frame
//! frame + session ─► writer::send (chunked, in order)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::document::ReceiptDocument;
use crate::error::{ConnectionError, PrintError};
use crate::ir::Program;
use crate::layout::ReceiptLayout;
use crate::printer::{PrintSettings, PrinterFormat, PrinterProfile};
use crate::transport::{DeviceScan, TransportRegistry, TransportVariant, WriteOptions, writer};

/// How a print request ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrintOutcome {
    /// The user dismissed the device picker; nothing was sent.
    Cancelled,
    /// Every chunk was written.
    Printed { bytes: usize, chunks: usize },
}

/// Layout, encoding and transport for receipts.
#[derive(Debug, Clone)]
pub struct PrintService {
    registry: TransportRegistry,
    settings: Arc<PrintSettings>,
}

impl PrintService {
    pub fn new(registry: TransportRegistry, settings: PrintSettings) -> Self {
        Self {
            registry,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    /// The receipt program at the configured paper width.
    pub fn program(&self, document: &ReceiptDocument) -> Program {
        ReceiptLayout::new(self.settings.paper_width)
            .render(document)
            .optimize()
    }

    /// The encoded frame at the configured paper width.
    pub fn frame(&self, document: &ReceiptDocument) -> Vec<u8> {
        self.program(document).encode()
    }

    /// Print `document` on the printer described by `profile`.
    ///
    /// ## Errors
    ///
    /// - [`PrintError::UnsupportedFormat`] for A4/A5 profiles
    /// - [`PrintError::UnsupportedTransport`] when no manager serves the
    ///   profile's connection type
    /// - [`PrintError::Connection`] when no session could be established
    /// - [`PrintError::Write`] when any chunk fails; the print is not retried
    #[instrument(skip_all, fields(bill = %document.bill.number, profile = %profile.id))]
    pub async fn print_receipt(
        &self,
        document: &ReceiptDocument,
        profile: &PrinterProfile,
    ) -> Result<PrintOutcome, PrintError> {
        if profile.format != PrinterFormat::Thermal {
            return Err(PrintError::UnsupportedFormat(format!("{:?}", profile.format)));
        }

        let manager = self.registry.get(profile.connection_type).ok_or_else(|| {
            PrintError::UnsupportedTransport(profile.connection_type.to_string())
        })?;

        let session = match manager.connect(profile.device_address.as_deref()).await {
            Ok(session) => session,
            Err(ConnectionError::UserCancelled) => {
                info!("print cancelled at device selection");
                return Ok(PrintOutcome::Cancelled);
            }
            Err(ConnectionError::UnsupportedTransport(reason)) => {
                return Err(PrintError::UnsupportedTransport(reason));
            }
            Err(e) => {
                warn!(error = %e, "printer not ready");
                return Err(e.into());
            }
        };

        let frame = self.frame(document);
        let options = WriteOptions::from(self.settings.as_ref());
        let report = writer::send(&frame, &session, &options)
            .await
            .inspect_err(|e| warn!(error = %e, session = %session.id(), "print failed"))?;

        info!(
            bytes = report.bytes,
            chunks = report.chunks,
            device = session.device().label(),
            "receipt printed"
        );
        Ok(PrintOutcome::Printed {
            bytes: report.bytes,
            chunks: report.chunks,
        })
    }

    /// Lazily scan for printers reachable over `variant`.
    ///
    /// Each call is a fresh scan.
    pub fn discover_devices(&self, variant: TransportVariant) -> DeviceScan {
        self.registry.scan(variant)
    }
}
