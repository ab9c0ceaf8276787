//! # Program Optimizer
//!
//! Passes that shrink a program without changing what gets printed. Fewer
//! bytes means fewer BLE writes, and with 20-byte chunks every saved opcode
//! counts.
//!
//! ## Optimization Passes
//!
//! 1. **Remove redundant styles**: don't emit `SetEmphasis(true)` if already on
//! 2. **Merge feeds**: combine consecutive `FeedLines`

use super::ops::{Instruction, Program, StyleState};

impl Program {
    /// Apply all optimization passes, returning a new program.
    pub fn optimize(self) -> Self {
        let instructions: Vec<Instruction> = self.into_iter().collect();
        let instructions = remove_redundant_styles(instructions);
        let instructions = merge_feeds(instructions);
        instructions.into_iter().collect()
    }
}

/// Drop style changes that match the tracked state.
///
/// State starts at the `ESC @` defaults the encoder emits first.
fn remove_redundant_styles(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut result = Vec::with_capacity(instructions.len());
    let mut state = StyleState::default();

    for instruction in instructions {
        match &instruction {
            Instruction::SetAlign(a) => {
                if *a != state.alignment {
                    state.alignment = *a;
                    result.push(instruction);
                }
            }
            Instruction::SetEmphasis(e) => {
                if *e != state.emphasis {
                    state.emphasis = *e;
                    result.push(instruction);
                }
            }
            _ => result.push(instruction),
        }
    }

    result
}

/// Merge consecutive `FeedLines`, saturating at 255 lines.
fn merge_feeds(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut result: Vec<Instruction> = Vec::with_capacity(instructions.len());

    for instruction in instructions {
        if let (Instruction::FeedLines(n), Some(Instruction::FeedLines(prev))) =
            (&instruction, result.last_mut())
        {
            *prev = prev.saturating_add(*n);
            continue;
        }
        result.push(instruction);
    }

    result
}
