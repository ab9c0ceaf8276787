//! # Receipt Instructions
//!
//! The instruction set a receipt program is written in. Each instruction is
//! a single atomic operation; the encoder maps each one to a fixed ESC/POS
//! opcode sequence.
//!
//! ```text
//! Layout → Program (inspectable) → Optimizer → Encoder → RawFrame
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::text::Alignment;

/// One receipt instruction.
///
/// Serializes as `{"op": "text", "value": "..."}` so programs can be dumped
/// from the CLI and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Instruction {
    /// One printed line (the encoder appends the line feed).
    Text(String),

    /// Alignment for the following lines.
    SetAlign(Alignment),

    /// Emphasized (bold) mode on/off.
    SetEmphasis(bool),

    /// QR code with the given payload, printed by the firmware.
    QrCode(String),

    /// Feed n blank lines.
    FeedLines(u8),

    /// Feed to the blade and partial cut.
    Cut,
}

/// Style state the optimizer tracks between instructions.
///
/// Matches what `ESC @` leaves the printer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleState {
    pub alignment: Alignment,
    pub emphasis: bool,
}

/// An immutable receipt program.
///
/// Built once per print request through [`ProgramBuilder`] (or collected
/// from an iterator) and never changed afterwards; passes such as
/// `optimize()` consume it and return a new program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Borrow the instructions in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Get the number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterate over instructions.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Program {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Append-only builder for a [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instruction.
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    /// Add a text line.
    pub fn text(&mut self, line: impl Into<String>) -> &mut Self {
        self.push(Instruction::Text(line.into()))
    }

    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        self.push(Instruction::SetAlign(alignment))
    }

    pub fn emphasis(&mut self, enabled: bool) -> &mut Self {
        self.push(Instruction::SetEmphasis(enabled))
    }

    /// Add multiple instructions.
    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) -> &mut Self {
        self.instructions.extend(instructions);
        self
    }

    /// Freeze into an immutable program.
    pub fn build(self) -> Program {
        Program {
            instructions: self.instructions,
        }
    }
}
