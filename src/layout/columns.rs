//! # Fixed-Width Columns
//!
//! Character-cell helpers for monospaced receipt text. Widths count `char`s,
//! which is what the printer sees once the encoder maps every character to
//! one byte.

/// Indent for continuation and detail lines under an item.
pub const INDENT: &str = "  ";

/// Truncate to at most `width` characters.
pub fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Left-align in a field of exactly `width` characters.
pub fn pad_right(text: &str, width: usize) -> String {
    let mut out = truncate(text, width);
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}

/// Right-align in a field of exactly `width` characters.
pub fn pad_left(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let len = text.chars().count();
    let mut out: String = std::iter::repeat_n(' ', width - len).collect();
    out.push_str(&text);
    out
}

/// Two-decimal money.
pub fn money(value: f64) -> String {
    format!("{:.2}", value)
}

/// Quantity without a pointless `.00` (strips are often fractional).
pub fn quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').to_string()
    }
}

/// Percentage label: `12%`, `2.5%`.
pub fn percent(rate: f64) -> String {
    format!("{}%", quantity(rate))
}

/// Right-aligned numeric field with at least one leading space.
///
/// Falls back from `formatted` to the rounded whole number when the value
/// does not fit, and truncates as a last resort; the result is always exactly
/// `width` characters.
pub fn number_field(formatted: &str, value: f64, width: usize) -> String {
    let room = width.saturating_sub(1);
    let text = if formatted.chars().count() <= room {
        formatted.to_string()
    } else {
        let whole = format!("{:.0}", value);
        if whole.chars().count() <= room {
            whole
        } else {
            truncate(&whole, room)
        }
    };
    pad_left(&text, width)
}

/// Split `text` so the head is at most `width` characters.
///
/// Prefers breaking at the last space in the second half of the head so
/// words stay whole; otherwise breaks mid-word.
pub fn split_head(text: &str, width: usize) -> (String, Option<String>) {
    let text = text.trim();
    if text.chars().count() <= width {
        return (text.to_string(), None);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut cut = width;
    if chars[width] != ' ' {
        if let Some(space) = chars[..width].iter().rposition(|&c| c == ' ') {
            if space > width / 2 {
                cut = space;
            }
        }
    }

    let head: String = chars[..cut].iter().collect::<String>().trim_end().to_string();
    let tail: String = chars[cut..].iter().collect::<String>().trim_start().to_string();
    (head, (!tail.is_empty()).then_some(tail))
}

/// Wrap `text` into indented lines no wider than `width`.
pub fn wrap_indented(text: &str, width: usize) -> Vec<String> {
    let room = width.saturating_sub(INDENT.len()).max(1);
    let mut lines = Vec::new();
    let mut rest = Some(text.to_string());

    while let Some(current) = rest {
        let (head, tail) = split_head(&current, room);
        lines.push(format!("{INDENT}{head}"));
        rest = tail;
    }

    lines
}

/// Column widths for the item table.
///
/// ```text
/// |name         |qty|   rate| amount|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemColumns {
    pub name: usize,
    pub qty: usize,
    pub rate: usize,
    pub amount: usize,
}

impl ItemColumns {
    /// Widths summing to exactly `width` (which must be at least 24).
    pub fn for_width(width: usize) -> Self {
        let (qty, rate, amount) = if width >= 42 { (5, 9, 10) } else { (4, 7, 8) };
        Self {
            name: width - qty - rate - amount,
            qty,
            rate,
            amount,
        }
    }

    pub fn total(&self) -> usize {
        self.name + self.qty + self.rate + self.amount
    }

    /// Characters of item name visible on the primary line.
    ///
    /// One cell stays blank so the name never touches the quantity.
    pub fn name_room(&self) -> usize {
        self.name - 1
    }

    pub fn heading(&self) -> String {
        format!(
            "{}{}{}{}",
            pad_right("Item", self.name),
            pad_left("Qty", self.qty),
            pad_left("Rate", self.rate),
            pad_left("Amount", self.amount),
        )
    }

    /// Primary item line; `name` must already fit [`name_room`](Self::name_room).
    pub fn row(&self, name: &str, qty: f64, rate: f64, amount: f64) -> String {
        format!(
            "{}{}{}{}",
            pad_right(&truncate(name, self.name_room()), self.name),
            number_field(&quantity(qty), qty, self.qty),
            number_field(&money(rate), rate, self.rate),
            number_field(&money(amount), amount, self.amount),
        )
    }
}

/// Column widths for the GST summary table: rate, taxable, CGST, SGST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxColumns {
    pub rate: usize,
    pub taxable: usize,
    pub half: usize,
}

impl TaxColumns {
    const RATE: usize = 6;

    pub fn for_width(width: usize) -> Self {
        let rest = width - Self::RATE;
        let half = rest / 3;
        Self {
            rate: Self::RATE,
            taxable: rest - 2 * half,
            half,
        }
    }

    pub fn heading(&self) -> String {
        format!(
            "{}{}{}{}",
            pad_right("GST%", self.rate),
            pad_left("Taxable", self.taxable),
            pad_left("CGST", self.half),
            pad_left("SGST", self.half),
        )
    }

    pub fn row(&self, rate: f64, taxable: f64, cgst: f64, sgst: f64) -> String {
        format!(
            "{}{}{}{}",
            pad_right(&percent(rate), self.rate),
            number_field(&money(taxable), taxable, self.taxable),
            number_field(&money(cgst), cgst, self.half),
            number_field(&money(sgst), sgst, self.half),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn width(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn test_pad_helpers() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_right("abcdef", 4), "abcd");
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(pad_left("abcdef", 4), "abcd");
    }

    #[test]
    fn test_quantity_format() {
        assert_eq!(quantity(2.0), "2");
        assert_eq!(quantity(1.5), "1.5");
        assert_eq!(quantity(0.25), "0.25");
        assert_eq!(percent(12.0), "12%");
        assert_eq!(percent(2.5), "2.5%");
    }

    #[test]
    fn test_number_field_falls_back_to_whole() {
        // 7 cells leave room for 6 characters
        assert_eq!(number_field("123.45", 123.45, 7), " 123.45");
        assert_eq!(number_field("1250.75", 1250.75, 7), "   1251");
        assert_eq!(number_field("12345678.00", 12345678.0, 7), " 123456");
    }

    #[test]
    fn test_split_head_prefers_word_break() {
        let (head, tail) = split_head("Amoxicillin Clavulanate 625", 16);
        assert_eq!(head, "Amoxicillin");
        assert_eq!(tail.as_deref(), Some("Clavulanate 625"));
    }

    #[test]
    fn test_split_head_mid_word_when_no_space() {
        let (head, tail) = split_head("Supercalifragilistic", 8);
        assert_eq!(head, "Supercal");
        assert_eq!(tail.as_deref(), Some("ifragilistic"));
    }

    #[test]
    fn test_split_head_fits() {
        assert_eq!(split_head("Crocin", 12), ("Crocin".to_string(), None));
    }

    #[test]
    fn test_wrap_indented() {
        let lines = wrap_indented("abcdefghij", 6);
        assert_eq!(lines, vec!["  abcd", "  efgh", "  ij"]);
        assert!(lines.iter().all(|l| width(l) <= 6));
    }

    #[test]
    fn test_item_columns_sum_to_width() {
        for w in 24..=64 {
            let cols = ItemColumns::for_width(w);
            assert_eq!(cols.total(), w);
            assert_eq!(width(&cols.heading()), w);
        }
    }

    #[test]
    fn test_item_row_width_32() {
        let cols = ItemColumns::for_width(32);
        let row = cols.row("Dolo 650", 2.0, 30.5, 61.0);
        assert_eq!(row, "Dolo 650        2  30.50   61.00");
        assert_eq!(width(&row), 32);
    }

    #[test]
    fn test_tax_columns_sum_to_width() {
        for w in 24..=64 {
            let cols = TaxColumns::for_width(w);
            assert_eq!(cols.rate + cols.taxable + 2 * cols.half, w);
            assert_eq!(width(&cols.row(18.0, 100.0, 9.0, 9.0)), w);
        }
    }
}
