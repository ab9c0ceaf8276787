//! # ESC/POS Protocol Implementation
//!
//! Low-level command builders for the subset of ESC/POS that receipts use.
//!
//! ## Module Structure
//!
//! - [`commands`]: Printer control (init, feed, cut)
//! - [`text`]: Alignment, emphasis, single-byte text lines
//! - [`qr`]: The `GS ( k` QR code store/print sequence
//!
//! ## Usage Example
//!
//! ```
//! use tillroll::protocol::{commands, qr, text};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(text::align(text::Alignment::Center));
//! data.extend(text::emphasis(true));
//! data.extend(text::line("CITY MEDICALS"));
//! data.extend(text::emphasis(false));
//! data.extend(qr::generate(b"upi://pay?pa=shop@upi", 6, qr::ErrorLevel::M));
//! data.extend(commands::cut());
//! ```

pub mod commands;
pub mod qr;
pub mod text;
