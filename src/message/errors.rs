//! Store error types.

use thiserror::Error;

use crate::kv::EngineError;

/// A stored record that could not be decoded back into a `Message`.
///
/// Indicates on-disk corruption or a schema mismatch; never skipped.
#[derive(Debug, Error)]
#[error("corrupt message record: {reason}")]
pub struct CorruptRecord {
    pub reason: String,
}

impl CorruptRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by `MessageStore` operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested identifier does not exist. Recoverable; maps to 404
    /// at the HTTP boundary.
    #[error("could not find message with {key}: {value}")]
    NotFound { key: &'static str, value: String },

    /// A record failed to decode. Internal failure at the boundary.
    #[error(transparent)]
    CorruptRecord(#[from] CorruptRecord),

    /// The engine failed a transaction or commit. Internal failure at the
    /// boundary.
    #[error("storage failure: {0}")]
    Storage(#[from] EngineError),
}

impl StoreError {
    pub fn not_found(id: u64) -> Self {
        Self::NotFound {
            key: "ID",
            value: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
