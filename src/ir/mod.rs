//! # Receipt Program (IR)
//!
//! The program layer sits between the layout engine and raw ESC/POS bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌───────────┐     ┌──────────┐
//! │   Layout    │ ──► │   Program   │ ──► │ Optimizer │ ──► │ Encoder  │
//! │  (document) │     │(Instruction)│     │           │     │ (bytes)  │
//! └─────────────┘     └─────────────┘     └───────────┘     └──────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use tillroll::ir::{Instruction, ProgramBuilder};
//! use tillroll::protocol::text::Alignment;
//!
//! let mut builder = ProgramBuilder::new();
//! builder.align(Alignment::Center).emphasis(true).text("HELLO");
//! builder.push(Instruction::Cut);
//! let program = builder.build();
//!
//! // Inspect, then encode
//! println!("{:#?}", program);
//! let frame = program.optimize().encode();
//! assert!(frame.starts_with(&[0x1B, 0x40]));
//! ```

mod codegen;
mod ops;
mod optimize;

pub use ops::*;
