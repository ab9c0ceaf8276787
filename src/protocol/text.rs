//! # ESC/POS Text Commands
//!
//! Alignment, emphasis and the single-byte text encoding.
//!
//! ## Text Alignment
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```

use serde::{Deserialize, Serialize};

use super::commands::{ESC, LF};

/// Byte substituted for characters outside the single-byte range.
pub const REPLACEMENT: u8 = b'?';

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// ## Protocol Details
///
/// | Format  | Bytes   |
/// |---------|---------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// ## Parameters
///
/// - `n = 0`: Left (default)
/// - `n = 1`: Center
/// - `n = 2`: Right
///
/// Takes effect at the start of a line; reset by `ESC @`.
///
/// ## Example
///
/// ```
/// use tillroll::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

// ============================================================================
// EMPHASIS
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
///
/// | Format  | Bytes   |
/// |---------|---------|
/// | ASCII   | ESC E n |
/// | Hex     | 1B 45 n |
///
/// Only the least significant bit of `n` is read by the firmware.
pub fn emphasis(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', enabled as u8]
}

// ============================================================================
// TEXT ENCODING
// ============================================================================

/// Encode one printed line: single-byte characters followed by `LF`.
///
/// Characters in U+0000..=U+00FF map to their code point byte (ASCII plus
/// Latin-1, which matches the printers' default code page for the symbols a
/// bill uses). Anything wider becomes [`REPLACEMENT`], so the output is always
/// exactly one byte per character.
///
/// Control characters never reach the printer: tab, CR and LF print as a
/// space, every other control character as [`REPLACEMENT`]. Text can neither
/// break a line early nor smuggle in a command such as `ESC E`.
///
/// ```
/// use tillroll::protocol::text::line;
///
/// assert_eq!(line("Rs 5"), b"Rs 5\n".to_vec());
/// assert_eq!(line("₹5"), b"?5\n".to_vec());
/// assert_eq!(line("a\nb\x1b"), b"a b?\n".to_vec());
/// ```
pub fn line(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 1);
    out.extend(text.chars().map(text_byte));
    out.push(LF);
    out
}

fn text_byte(c: char) -> u8 {
    match c {
        '\t' | '\n' | '\r' => b' ',
        c if c.is_control() => REPLACEMENT,
        c => u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(emphasis(true), vec![0x1B, 0x45, 0x01]);
        assert_eq!(emphasis(false), vec![0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_line_ascii() {
        assert_eq!(line("TOTAL"), vec![b'T', b'O', b'T', b'A', b'L', 0x0A]);
    }

    #[test]
    fn test_line_empty() {
        assert_eq!(line(""), vec![0x0A]);
    }

    #[test]
    fn test_line_latin1_single_byte() {
        // 'é' is U+00E9
        assert_eq!(line("café"), vec![b'c', b'a', b'f', 0xE9, 0x0A]);
    }

    #[test]
    fn test_line_wide_chars_replaced() {
        let bytes = line("₹ 10");
        assert_eq!(bytes, vec![b'?', b' ', b'1', b'0', 0x0A]);
        assert_eq!(bytes.len(), "₹ 10".chars().count() + 1);
    }

    #[test]
    fn test_line_control_chars_neutralized() {
        let bytes = line("Dolo\n650\x1bE\x01\t\x7f\u{9b}");
        assert_eq!(bytes, b"Dolo 650?E? ??\n".to_vec());
        assert_eq!(bytes.iter().filter(|&&b| b == LF).count(), 1);
        assert!(!bytes.contains(&ESC));
    }

    #[test]
    fn test_alignment_default() {
        assert_eq!(Alignment::default(), Alignment::Left);
    }
}
