//! # Chunked Frame Writer
//!
//! Sends a frame over a session's [`WriteChannel`](super::WriteChannel) in
//! chunks small enough for the device buffer. BLE printers take at most
//! `MTU - 3` bytes per write (20 on the default 23-byte MTU), so the default
//! chunk size is 20.
//!
//! ## Ordering
//!
//! Chunks go out strictly in order; each write completes before the next is
//! issued. The first failure aborts the send, so a frame is either fully
//! written or reported as failed. Losing the session's link, before a chunk
//! or while one is in flight, is a failure too.
//!
//! ## Write Mode
//!
//! | Channel supports | Mode used |
//! |------------------|-----------|
//! | unacknowledged (with or without acknowledged) | unacknowledged |
//! | acknowledged only | acknowledged, awaited per chunk |

use std::time::Duration;

use tracing::{debug, trace, warn};

use super::Session;
use crate::error::WriteError;
use crate::printer::PrintSettings;

/// Default bytes per write.
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Default per-chunk deadline.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// How to split and pace a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub chunk_size: usize,
    /// Pause after every chunk except the last.
    pub chunk_delay: Duration,
    /// Deadline for each individual chunk write.
    pub write_timeout: Duration,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::ZERO,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl From<&PrintSettings> for WriteOptions {
    fn from(settings: &PrintSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_delay: settings.chunk_delay(),
            write_timeout: settings.write_timeout(),
        }
    }
}

/// What a completed send did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub bytes: usize,
    pub chunks: usize,
}

/// Number of writes needed for `len` bytes: `ceil(len / chunk_size)`.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        0
    } else {
        len.div_ceil(chunk_size)
    }
}

/// Write `frame` to the session's channel in order, one chunk at a time.
///
/// ## Errors
///
/// - [`WriteError::InvalidChunkSize`] when `chunk_size` is zero
/// - [`WriteError::Failed`] when the channel rejects a chunk, or supports no writes
/// - [`WriteError::TimedOut`] when a chunk exceeds `write_timeout`
/// - [`WriteError::Disconnected`] when the link drops before the last chunk lands
pub async fn send(
    frame: &[u8],
    session: &Session,
    options: &WriteOptions,
) -> Result<SendReport, WriteError> {
    if options.chunk_size == 0 {
        return Err(WriteError::InvalidChunkSize);
    }

    let channel = session.channel();
    let caps = channel.capabilities();
    if !caps.any() {
        return Err(WriteError::Failed {
            chunk: 0,
            reason: "channel supports no write mode".into(),
        });
    }
    let unacknowledged = caps.unacknowledged;

    let total = chunk_count(frame.len(), options.chunk_size);
    debug!(
        bytes = frame.len(),
        chunks = total,
        chunk_size = options.chunk_size,
        unacknowledged,
        "sending frame"
    );

    for (index, chunk) in frame.chunks(options.chunk_size).enumerate() {
        if !session.is_connected() {
            warn!(chunk = index, session = %session.id(), "link lost before chunk");
            return Err(WriteError::Disconnected { chunk: index });
        }

        let write = async {
            if unacknowledged {
                channel.write_unacknowledged(chunk).await
            } else {
                channel.write_acknowledged(chunk).await
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = session.disconnected() => {
                warn!(chunk = index, session = %session.id(), "link lost during chunk");
                return Err(WriteError::Disconnected { chunk: index });
            }
            outcome = tokio::time::timeout(options.write_timeout, write) => outcome,
        };

        match outcome {
            Ok(Ok(())) => trace!(chunk = index, len = chunk.len(), "chunk written"),
            Ok(Err(e)) => {
                warn!(chunk = index, error = %e, "chunk write failed");
                return Err(WriteError::Failed {
                    chunk: index,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(chunk = index, "chunk write timed out");
                return Err(WriteError::TimedOut {
                    chunk: index,
                    millis: options.write_timeout.as_millis() as u64,
                });
            }
        }

        if !options.chunk_delay.is_zero() && index + 1 < total {
            tokio::time::sleep(options.chunk_delay).await;
        }
    }

    Ok(SendReport {
        bytes: frame.len(),
        chunks: total,
    })
}
