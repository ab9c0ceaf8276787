//! # ESC/POS QR Code Sub-Protocol (GS ( k)
//!
//! QR codes are rendered by the printer firmware from stored symbol data.
//! Printing one takes five function calls of the `GS ( k` family, all of
//! them on the QR code symbol (`cn = 49`, '1'):
//!
//! | Step | Function | Bytes |
//! |------|----------|-------|
//! | 1 | 165: select model | `1D 28 6B 04 00 31 41 n1 n2` |
//! | 2 | 167: module size | `1D 28 6B 03 00 31 43 n` |
//! | 3 | 169: error correction | `1D 28 6B 03 00 31 45 n` |
//! | 4 | 180: store data | `1D 28 6B pL pH 31 50 30 d1...dk` |
//! | 5 | 181: print stored data | `1D 28 6B 03 00 31 51 30` |
//!
//! ## The Length Header
//!
//! `pL pH` count every byte after themselves: `cn`, `fn`, `m` and the data.
//! For `k` data bytes that is `k + 3`, written little-endian:
//!
//! ```text
//! pL + pH * 256 == k + 3
//! ```
//!
//! Printers given a wrong header (or data without the store call) do not
//! report an error; they print nothing at all.

use super::commands::{GS, u16_le};

/// Prefix shared by every call: `GS ( k`.
const PREFIX: [u8; 3] = [GS, b'(', b'k'];

/// Symbol type byte for QR code.
const CN_QR: u8 = 0x31;

/// Bytes the store header counts besides the data (`cn`, `fn`, `m`).
pub const STORE_HEADER_OVERHEAD: usize = 3;

/// Largest payload whose store header still fits in a `u16`.
pub const MAX_PAYLOAD: usize = u16::MAX as usize - STORE_HEADER_OVERHEAD;

/// Module (dot cell) size used for receipts. 6 scans reliably off 58mm paper.
pub const DEFAULT_MODULE_SIZE: u8 = 6;

/// QR error correction level
///
/// | Level | Recovery | n |
/// |-------|----------|---|
/// | L | ~7% | 48 |
/// | M | ~15% | 49 |
/// | Q | ~25% | 50 |
/// | H | ~30% | 51 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorLevel {
    L = 48,
    #[default]
    M = 49,
    Q = 50,
    H = 51,
}

/// Function 165: select QR model 2.
pub fn select_model() -> Vec<u8> {
    let mut out = PREFIX.to_vec();
    out.extend([0x04, 0x00, CN_QR, 0x41, 0x32, 0x00]);
    out
}

/// Function 167: module size in dots, clamped to the firmware range 1..=16.
pub fn module_size(size: u8) -> Vec<u8> {
    let mut out = PREFIX.to_vec();
    out.extend([0x03, 0x00, CN_QR, 0x43, size.clamp(1, 16)]);
    out
}

/// Function 169: error correction level.
pub fn error_correction(level: ErrorLevel) -> Vec<u8> {
    let mut out = PREFIX.to_vec();
    out.extend([0x03, 0x00, CN_QR, 0x45, level as u8]);
    out
}

/// Function 180: store symbol data with its length header.
///
/// Payloads longer than [`MAX_PAYLOAD`] are cut at that length so the header
/// always describes exactly the bytes that follow it.
///
/// ```
/// use tillroll::protocol::qr::store;
///
/// let cmd = store(b"upi");
/// // GS ( k, then pL pH = 3 + 3 = 6
/// assert_eq!(&cmd[..5], &[0x1D, 0x28, 0x6B, 0x06, 0x00]);
/// assert_eq!(&cmd[5..8], &[0x31, 0x50, 0x30]);
/// assert_eq!(&cmd[8..], b"upi");
/// ```
pub fn store(data: &[u8]) -> Vec<u8> {
    let data = &data[..data.len().min(MAX_PAYLOAD)];
    let [low, high] = u16_le((data.len() + STORE_HEADER_OVERHEAD) as u16);

    let mut out = Vec::with_capacity(PREFIX.len() + 5 + data.len());
    out.extend(PREFIX);
    out.extend([low, high, CN_QR, 0x50, 0x30]);
    out.extend(data);
    out
}

/// Function 181: print the stored symbol.
pub fn print() -> Vec<u8> {
    let mut out = PREFIX.to_vec();
    out.extend([0x03, 0x00, CN_QR, 0x51, 0x30]);
    out
}

/// Full five-step sequence for one QR code.
pub fn generate(data: &[u8], size: u8, level: ErrorLevel) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(select_model());
    out.extend(module_size(size));
    out.extend(error_correction(level));
    out.extend(store(data));
    out.extend(print());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cmd: &[u8]) -> usize {
        cmd[3] as usize + 256 * cmd[4] as usize
    }

    #[test]
    fn test_select_model() {
        assert_eq!(
            select_model(),
            vec![0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]
        );
    }

    #[test]
    fn test_module_size() {
        assert_eq!(
            module_size(6),
            vec![0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 0x06]
        );
        assert_eq!(module_size(0)[7], 1);
        assert_eq!(module_size(40)[7], 16);
    }

    #[test]
    fn test_error_correction() {
        assert_eq!(
            error_correction(ErrorLevel::M),
            vec![0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31]
        );
        assert_eq!(error_correction(ErrorLevel::L)[7], 0x30);
        assert_eq!(error_correction(ErrorLevel::H)[7], 0x33);
    }

    #[test]
    fn test_store_short_payload_exact_bytes() {
        assert_eq!(
            store(b"Hello"),
            vec![
                0x1D, 0x28, 0x6B, 0x08, 0x00, 0x31, 0x50, 0x30, b'H', b'e', b'l', b'l', b'o'
            ]
        );
    }

    #[test]
    fn test_store_empty_payload() {
        assert_eq!(store(b""), vec![0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x50, 0x30]);
    }

    #[test]
    fn test_store_header_crosses_byte_boundary() {
        // 253 + 3 = 256 -> pL = 0, pH = 1
        let cmd = store(&[b'x'; 253]);
        assert_eq!(cmd[3], 0x00);
        assert_eq!(cmd[4], 0x01);

        // 252 + 3 = 255 -> pL = 255, pH = 0
        let cmd = store(&[b'x'; 252]);
        assert_eq!(cmd[3], 0xFF);
        assert_eq!(cmd[4], 0x00);
    }

    #[test]
    fn test_store_header_matches_length_for_many_sizes() {
        for len in [0usize, 1, 2, 100, 252, 253, 254, 511, 1000, 4096] {
            let payload = vec![b'a'; len];
            let cmd = store(&payload);
            assert_eq!(header(&cmd), len + 3, "payload length {len}");
            assert_eq!(cmd.len(), 8 + len);
        }
    }

    #[test]
    fn test_store_truncates_oversized_payload() {
        let payload = vec![b'z'; MAX_PAYLOAD + 10];
        let cmd = store(&payload);
        assert_eq!(header(&cmd), u16::MAX as usize);
        assert_eq!(cmd.len(), 8 + MAX_PAYLOAD);
    }

    #[test]
    fn test_print() {
        assert_eq!(print(), vec![0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
    }

    #[test]
    fn test_generate_order() {
        let cmd = generate(b"pay", DEFAULT_MODULE_SIZE, ErrorLevel::M);
        let mut expected = Vec::new();
        expected.extend(select_model());
        expected.extend(module_size(6));
        expected.extend(error_correction(ErrorLevel::M));
        expected.extend(store(b"pay"));
        expected.extend(print());
        assert_eq!(cmd, expected);
        assert!(cmd.ends_with(&[0x31, 0x51, 0x30]));
    }
}
