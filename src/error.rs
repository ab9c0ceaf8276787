//! # Error Types
//!
//! Errors for each stage of a print: connecting to the device, writing the
//! frame, and the combined result handed to callers.

use thiserror::Error;

/// Errors establishing a session with a printer.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The user dismissed the device picker. Not a fault.
    #[error("Device selection cancelled")]
    UserCancelled,

    /// The device exposes no characteristic that accepts writes.
    #[error("No writable channel on {0}")]
    NoWritableChannel(String),

    /// The device could not be reached or the link dropped during setup.
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(String),

    /// This environment has no API for the requested transport.
    #[error("Transport not supported here: {0}")]
    UnsupportedTransport(String),

    /// Backend (adapter, bridge process) error.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors writing a frame to an established session.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A chunk was rejected; earlier chunks may already be on paper.
    #[error("Write failed at chunk {chunk}: {reason}")]
    Failed { chunk: usize, reason: String },

    /// A chunk did not complete within the write deadline.
    #[error("Write timed out at chunk {chunk} after {millis}ms")]
    TimedOut { chunk: usize, millis: u64 },

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    /// The session's link went down before or during this chunk.
    #[error("Device disconnected at chunk {chunk}")]
    Disconnected { chunk: usize },
}

/// Result of a failed `print_receipt`.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// No transport is installed for the profile's connection type.
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// The profile targets a page format this crate does not render.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl PrintError {
    /// Whether this should surface as "printer not ready".
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            PrintError::Connection(
                ConnectionError::NoWritableChannel(_)
                    | ConnectionError::DeviceUnreachable(_)
                    | ConnectionError::Backend(_)
                    | ConnectionError::Io(_)
            ) | PrintError::Write(WriteError::Disconnected { .. })
        )
    }
}

/// Errors loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
