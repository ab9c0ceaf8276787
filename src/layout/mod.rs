//! # Receipt Layout Engine
//!
//! Turns a [`ReceiptDocument`] into a receipt [`Program`] for a paper width
//! given in characters (32 on a 58mm roll, 48 on 80mm).
//!
//! ## Sections
//!
//! ```text
//!          CITY MEDICALS          <- centered, emphasized
//!       12 MG Road, Pune          <- address, GSTIN
//! Bill: INV-1042                  <- bill details
//! --------------------------------
//! Item            Qty   Rate   Amount
//! Dolo 650        2  30.50   61.00
//!   Batch: D24A  Exp: 08/27       <- only when the item has the data
//! --------------------------------
//!                 Sub Total: ...  <- right-aligned
//! --------------------------------
//! GST%   Taxable    CGST    SGST
//! --------------------------------
//!            [QR]                 <- only with a payment id and total > 0
//!      Thank you! Visit again.
//! ```
//!
//! Missing optional data drops its block; rendering never fails.

pub mod columns;
pub mod tax;

use crate::document::{LineItem, ReceiptDocument};
use crate::ir::{Instruction, Program, ProgramBuilder};
use crate::protocol::text::Alignment;
use columns::{ItemColumns, TaxColumns, money, split_head, truncate, wrap_indented};

/// Narrowest supported paper width in characters.
pub const MIN_WIDTH: usize = 24;

/// Widest supported paper width in characters.
pub const MAX_WIDTH: usize = 64;

/// Paper width of a 58mm roll in Font A.
pub const DEFAULT_WIDTH: usize = 32;

/// Closing line on every receipt.
pub const THANK_YOU: &str = "Thank you! Visit again.";

/// Blank lines fed between the footer and the cut.
const TRAILING_FEED: u8 = 2;

/// Lays receipts out for one paper width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLayout {
    width: usize,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl ReceiptLayout {
    /// Layout for `width` characters, clamped to [`MIN_WIDTH`]..=[`MAX_WIDTH`].
    pub fn new(width: usize) -> Self {
        Self {
            width: width.clamp(MIN_WIDTH, MAX_WIDTH),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Full-width separator line.
    pub fn separator(&self) -> String {
        "-".repeat(self.width)
    }

    /// Render the whole receipt, ending in a single cut.
    pub fn render(&self, doc: &ReceiptDocument) -> Program {
        let mut out = ProgramBuilder::new();

        self.header(doc, &mut out);
        self.items(&doc.items, &mut out);
        self.totals(doc, &mut out);
        self.tax_summary(&doc.items, &mut out);
        self.payment_qr(doc, &mut out);
        self.footer(doc, &mut out);

        out.push(Instruction::FeedLines(TRAILING_FEED));
        out.push(Instruction::Cut);
        out.build()
    }

    fn header(&self, doc: &ReceiptDocument, out: &mut ProgramBuilder) {
        let company = &doc.company;
        let w = self.width;

        out.align(Alignment::Center);
        if !company.name.trim().is_empty() {
            out.emphasis(true)
                .text(truncate(company.name.trim(), w))
                .emphasis(false);
        }
        for line in company.address.iter().filter(|l| !l.trim().is_empty()) {
            out.text(truncate(line.trim(), w));
        }
        if let Some(phone) = non_blank(&company.phone) {
            out.text(truncate(&format!("Ph: {phone}"), w));
        }
        if let Some(gstin) = non_blank(&company.tax_id) {
            out.text(truncate(&format!("GSTIN: {gstin}"), w));
        }

        let bill = &doc.bill;
        out.align(Alignment::Left);
        out.text(truncate(&format!("Bill: {}", bill.number), w));
        out.text(truncate(
            &format!("Date: {}", bill.date.format("%d-%m-%Y %H:%M")),
            w,
        ));
        if !bill.customer.trim().is_empty() {
            out.text(truncate(&format!("Customer: {}", bill.customer.trim()), w));
        }
        if let Some(doctor) = non_blank(&bill.doctor) {
            out.text(truncate(&format!("Doctor: {doctor}"), w));
        }
        out.text(self.separator());
    }

    fn items(&self, items: &[LineItem], out: &mut ProgramBuilder) {
        let cols = ItemColumns::for_width(self.width);

        out.align(Alignment::Left);
        out.text(cols.heading());
        for item in items {
            for line in self.item_lines(&cols, item) {
                out.text(line);
            }
        }
        out.text(self.separator());
    }

    /// Physical lines for one item: primary row, name continuation, batch details.
    fn item_lines(&self, cols: &ItemColumns, item: &LineItem) -> Vec<String> {
        let (head, rest) = split_head(&item.name, cols.name_room());

        let mut lines = vec![cols.row(&head, item.quantity, item.rate, item.total)];
        if let Some(rest) = rest {
            lines.extend(wrap_indented(&rest, self.width));
        }

        if item.has_batch_details() {
            let mut detail = String::from(columns::INDENT);
            if let Some(batch) = non_blank(&item.batch) {
                detail.push_str(&format!("Batch: {batch}"));
            }
            if let Some(expiry) = non_blank(&item.expiry) {
                if detail.len() > columns::INDENT.len() {
                    detail.push_str("  ");
                }
                detail.push_str(&format!("Exp: {expiry}"));
            }
            if detail.len() > columns::INDENT.len() {
                lines.push(truncate(&detail, self.width));
            }
        }

        lines
    }

    fn totals(&self, doc: &ReceiptDocument, out: &mut ProgramBuilder) {
        let totals = &doc.totals;

        out.align(Alignment::Right);
        out.text(self.amount_line("Sub Total:", totals.subtotal));
        out.text(self.amount_line("GST:", totals.tax));
        out.emphasis(true)
            .text(self.amount_line("Grand Total:", totals.grand_total))
            .emphasis(false);
        out.align(Alignment::Left);
        out.text(self.separator());
    }

    fn amount_line(&self, label: &str, amount: f64) -> String {
        truncate(&format!("{label} {:>10}", money(amount)), self.width)
    }

    fn tax_summary(&self, items: &[LineItem], out: &mut ProgramBuilder) {
        let rows = tax::summarize(items);
        if rows.is_empty() {
            return;
        }

        let cols = TaxColumns::for_width(self.width);
        out.align(Alignment::Left);
        out.text(cols.heading());
        for row in &rows {
            out.text(cols.row(row.rate, row.taxable, row.cgst(), row.sgst()));
        }
        out.text(self.separator());
    }

    fn payment_qr(&self, doc: &ReceiptDocument, out: &mut ProgramBuilder) {
        let Some(payee) = doc.payment_target() else {
            return;
        };

        out.align(Alignment::Center);
        out.text("Scan to pay");
        out.push(Instruction::QrCode(upi_uri(
            payee,
            &doc.company.name,
            doc.totals.grand_total,
            &doc.bill.number,
        )));
    }

    fn footer(&self, doc: &ReceiptDocument, out: &mut ProgramBuilder) {
        out.align(Alignment::Center);
        out.text(truncate(THANK_YOU, self.width));
        if let Some(note) = non_blank(&doc.footer_note) {
            out.text(truncate(note, self.width));
        }
        out.align(Alignment::Left);
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// UPI deep link for a payment of `amount` to `payee`.
///
/// ```
/// use tillroll::layout::upi_uri;
///
/// assert_eq!(
///     upi_uri("shop@upi", "City Medicals", 118.0, "INV-1"),
///     "upi://pay?pa=shop@upi&pn=City%20Medicals&am=118.00&cu=INR&tn=Bill%20INV-1"
/// );
/// ```
pub fn upi_uri(payee: &str, name: &str, amount: f64, bill_number: &str) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR&tn={}",
        percent_encode(payee),
        percent_encode(name.trim()),
        money(amount),
        percent_encode(&format!("Bill {bill_number}")),
    )
}

/// Percent-encode everything outside the URI unreserved set (and `@`,
/// which UPI addresses keep literal).
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
