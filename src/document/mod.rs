//! # Receipt Document Model
//!
//! The input handed over by the billing side: company header, bill header,
//! line items and totals. The layout engine reads it; nothing in this crate
//! mutates it.
//!
//! ## Example
//!
//! ```
//! use tillroll::document::{BillHeader, CompanyHeader, LineItem, ReceiptDocument, Totals};
//!
//! let doc = ReceiptDocument {
//!     company: CompanyHeader {
//!         name: "City Medicals".into(),
//!         ..Default::default()
//!     },
//!     bill: BillHeader {
//!         number: "INV-42".into(),
//!         date: "2026-10-19T10:15:00".parse().unwrap(),
//!         customer: "Walk-in".into(),
//!         doctor: None,
//!     },
//!     items: vec![LineItem::new("Paracetamol 500mg", 2.0, 15.0, 12.0)],
//!     totals: Totals { subtotal: 26.79, tax: 3.21, grand_total: 30.0 },
//!     footer_note: None,
//! };
//! assert_eq!(doc.items[0].total, 30.0);
//! ```

mod types;

pub use types::*;
