//! # Code Generation
//!
//! Converts receipt programs to ESC/POS bytes.

use super::ops::{Instruction, Program};
use crate::protocol::{commands, qr, text};

impl Program {
    /// Compile the program to a raw ESC/POS frame.
    ///
    /// The frame always starts with `ESC @`. Encoding is total: every
    /// instruction has a byte sequence, so this cannot fail and depends on
    /// nothing but the program itself.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = commands::init();

        for instruction in self {
            match instruction {
                Instruction::Text(line) => {
                    out.extend(text::line(line));
                }
                Instruction::SetAlign(alignment) => {
                    out.extend(text::align(*alignment));
                }
                Instruction::SetEmphasis(enabled) => {
                    out.extend(text::emphasis(*enabled));
                }
                Instruction::QrCode(payload) => {
                    out.extend(qr::generate(
                        payload.as_bytes(),
                        qr::DEFAULT_MODULE_SIZE,
                        qr::ErrorLevel::default(),
                    ));
                }
                Instruction::FeedLines(n) => {
                    out.extend(commands::feed_lines(*n));
                }
                Instruction::Cut => {
                    out.extend(commands::cut());
                }
            }
        }

        out
    }
}
