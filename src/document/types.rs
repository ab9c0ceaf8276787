//! Receipt document types.
//!
//! All types derive `Serialize + Deserialize` so the billing side can hand
//! a bill over as JSON (CLI files, HTTP API) or build it in Rust.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Shop identity printed at the top of every receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyHeader {
    pub name: String,

    /// Address lines, printed in order.
    #[serde(default)]
    pub address: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// GSTIN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    /// UPI virtual payment address. Enables the pay-by-QR block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

/// Bill identity and parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillHeader {
    pub number: String,
    pub date: NaiveDateTime,
    pub customer: String,

    /// Prescribing doctor (pharmacy bills).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
}

/// One billed product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub rate: f64,

    /// Tax-inclusive amount for the line.
    pub total: f64,

    /// GST rate in percent (e.g. 12.0).
    #[serde(default)]
    pub tax_rate: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

impl LineItem {
    /// Line with `total = quantity * rate`.
    pub fn new(name: impl Into<String>, quantity: f64, rate: f64, tax_rate: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            rate,
            total: quantity * rate,
            tax_rate,
            batch: None,
            expiry: None,
        }
    }

    pub fn with_batch(mut self, batch: impl Into<String>, expiry: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self.expiry = Some(expiry.into());
        self
    }

    /// Whether the item carries pharma batch/expiry data.
    pub fn has_batch_details(&self) -> bool {
        self.batch.is_some() || self.expiry.is_some()
    }
}

/// Totals as computed by the billing side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub grand_total: f64,
}

/// A finished bill, ready to print. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    pub company: CompanyHeader,
    pub bill: BillHeader,

    #[serde(default)]
    pub items: Vec<LineItem>,

    pub totals: Totals,

    /// Single custom remark printed under the thank-you line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_note: Option<String>,
}

impl ReceiptDocument {
    /// Payment identifier, if a QR payment block should be printed.
    ///
    /// Requires a non-blank identifier and a positive grand total.
    pub fn payment_target(&self) -> Option<&str> {
        let id = self.company.payment_id.as_deref()?.trim();
        (!id.is_empty() && self.totals.grand_total > 0.0).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> ReceiptDocument {
        ReceiptDocument {
            company: CompanyHeader {
                name: "City Medicals".into(),
                payment_id: Some("citymed@okbank".into()),
                ..Default::default()
            },
            bill: BillHeader {
                number: "INV-1".into(),
                date: NaiveDateTime::parse_from_str("2026-10-19 10:00", "%Y-%m-%d %H:%M").unwrap(),
                customer: "Walk-in".into(),
                doctor: None,
            },
            items: vec![LineItem::new("Paracetamol 500", 2.0, 15.0, 12.0)],
            totals: Totals {
                subtotal: 26.79,
                tax: 3.21,
                grand_total: 30.0,
            },
            footer_note: None,
        }
    }

    #[test]
    fn test_line_item_total() {
        let item = LineItem::new("Syrup", 3.0, 42.5, 12.0);
        assert_eq!(item.total, 127.5);
        assert!(!item.has_batch_details());
        assert!(item.with_batch("B12", "08/27").has_batch_details());
    }

    #[test]
    fn test_payment_target_requires_positive_total() {
        let mut doc = document();
        assert_eq!(doc.payment_target(), Some("citymed@okbank"));

        doc.totals.grand_total = 0.0;
        assert_eq!(doc.payment_target(), None);
    }

    #[test]
    fn test_payment_target_blank_id() {
        let mut doc = document();
        doc.company.payment_id = Some("   ".into());
        assert_eq!(doc.payment_target(), None);
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{
            "company": {"name": "Shop"},
            "bill": {"number": "7", "date": "2026-10-19T09:30:00", "customer": "Cash"},
            "totals": {"subtotal": 0, "tax": 0, "grand_total": 0}
        }"#;
        let doc: ReceiptDocument = serde_json::from_str(json).unwrap();
        assert!(doc.items.is_empty());
        assert!(doc.company.address.is_empty());
        assert_eq!(doc.footer_note, None);
    }
}
