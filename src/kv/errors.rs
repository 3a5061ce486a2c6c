//! Engine error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the key-value engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Disk I/O failure while opening, reading, or appending the log.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Another process holds the data directory lock.
    #[error("data directory is locked by another process: {}", .0.display())]
    Locked(PathBuf),

    /// A committed frame failed checksum or structural validation.
    /// Never skipped: a corrupt log refuses to open.
    #[error("log corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Operation referenced a bucket that was never created.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// A transaction's encoded commit would not fit the on-disk frame
    /// format. Rejected before anything reaches the file.
    #[error("commit frame of {size} bytes exceeds the 4 GiB frame limit")]
    FrameTooLarge { size: u64 },

    /// The log writer could not roll back a failed append and has
    /// disabled itself; the file may hold unacknowledged bytes.
    #[error("log writer disabled after an unrecoverable append failure")]
    LogPoisoned,

    /// An internal lock was poisoned by a panicking thread.
    #[error("engine lock poisoned by a panicking thread")]
    Poisoned,
}

impl EngineError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corruption {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
