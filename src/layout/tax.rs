//! # GST Summary
//!
//! Per-rate breakdown recomputed from the line items. Line totals are tax
//! inclusive, so the taxable value is backed out of each total:
//!
//! ```text
//! taxable = Σ total / (1 + rate / 100)
//! tax     = Σ total − taxable
//! CGST    = SGST = tax / 2
//! ```
//!
//! The item sums are authoritative: when the document's own subtotal and
//! the sum of its items disagree by rounding, the summary follows the items.

use std::collections::BTreeMap;

use crate::document::LineItem;

/// One summary row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxRow {
    /// Rate in percent.
    pub rate: f64,
    pub taxable: f64,
    pub tax: f64,
}

impl TaxRow {
    /// Central half of the tax.
    pub fn cgst(&self) -> f64 {
        self.tax / 2.0
    }

    /// State half of the tax.
    pub fn sgst(&self) -> f64 {
        self.tax / 2.0
    }
}

/// Rows for every distinct rate, ascending by rate.
pub fn summarize(items: &[LineItem]) -> Vec<TaxRow> {
    // Keyed by hundredths of a percent so 12.0 and 12.00 share a row
    let mut groups: BTreeMap<i64, (f64, f64)> = BTreeMap::new();

    for item in items {
        let key = (item.tax_rate * 100.0).round() as i64;
        let entry = groups.entry(key).or_insert((0.0, 0.0));
        entry.0 += item.total;
        entry.1 += taxable_value(item.total, item.tax_rate);
    }

    groups
        .into_iter()
        .map(|(key, (gross, taxable))| TaxRow {
            rate: key as f64 / 100.0,
            taxable,
            tax: gross - taxable,
        })
        .collect()
}

/// Tax-exclusive value of a tax-inclusive amount.
///
/// Rates at or below -100% have no meaningful inverse; such lines are
/// treated as untaxed rather than dividing by zero.
fn taxable_value(total: f64, rate: f64) -> f64 {
    let divisor = 1.0 + rate / 100.0;
    if divisor > 0.0 && divisor.is_finite() {
        total / divisor
    } else {
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(total: f64, rate: f64) -> LineItem {
        LineItem {
            name: "x".into(),
            quantity: 1.0,
            rate: total,
            total,
            tax_rate: rate,
            batch: None,
            expiry: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_two_rates_sorted_ascending() {
        let rows = summarize(&[item(118.0, 18.0), item(112.0, 12.0)]);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].rate, 12.0);
        assert!(close(rows[0].taxable, 100.0));
        assert!(close(rows[0].tax, 12.0));
        assert!(close(rows[0].cgst(), 6.0));
        assert!(close(rows[0].sgst(), 6.0));

        assert_eq!(rows[1].rate, 18.0);
        assert!(close(rows[1].taxable, 100.0));
        assert!(close(rows[1].tax, 18.0));
        assert!(close(rows[1].cgst(), 9.0));
        assert!(close(rows[1].sgst(), 9.0));
    }

    #[test]
    fn test_same_rate_accumulates() {
        let rows = summarize(&[item(56.0, 12.0), item(56.0, 12.0), item(105.0, 5.0)]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rate, 5.0);
        assert!(close(rows[0].taxable, 100.0));
        assert!(close(rows[1].taxable, 100.0));
        assert!(close(rows[1].tax, 12.0));
    }

    #[test]
    fn test_zero_rate_row() {
        let rows = summarize(&[item(40.0, 0.0)]);
        assert_eq!(rows.len(), 1);
        assert!(close(rows[0].taxable, 40.0));
        assert!(close(rows[0].tax, 0.0));
    }

    #[test]
    fn test_fractional_rate_key() {
        let rows = summarize(&[item(102.5, 2.5), item(102.5, 2.50)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rate, 2.5);
        assert!(close(rows[0].taxable, 200.0));
    }

    #[test]
    fn test_degenerate_rate_is_untaxed() {
        let rows = summarize(&[item(10.0, -100.0)]);
        assert!(close(rows[0].taxable, 10.0));
        assert!(close(rows[0].tax, 0.0));
    }

    #[test]
    fn test_empty() {
        assert!(summarize(&[]).is_empty());
    }
}
