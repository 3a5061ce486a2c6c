//! Message model and record codec.
//!
//! Records are stored as JSON with the wire field names (`id`, `message`,
//! `isPalindrome`, `createdAt`), so the persisted value doubles as the
//! HTTP response body and stays compatible with data files written by
//! earlier deployments of this service.

use serde::{Deserialize, Serialize};

use super::errors::CorruptRecord;

/// The sole stored entity: one short immutable text plus derived fields.
///
/// `id` and `created_at` are assigned by the store at creation and never
/// change; `is_palindrome` is derived from `message` once and stored, not
/// recomputed on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub message: String,
    #[serde(rename = "isPalindrome")]
    pub is_palindrome: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl Message {
    /// Serialize to the durable record bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CorruptRecord> {
        serde_json::to_vec(self).map_err(|e| CorruptRecord::new(format!("encode: {}", e)))
    }

    /// Decode a durable record. Fails on anything that does not parse into
    /// the full four-field shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, CorruptRecord> {
        serde_json::from_slice(bytes).map_err(|e| CorruptRecord::new(format!("decode: {}", e)))
    }
}

/// The bucket key for an id: 8 bytes, big-endian.
///
/// Big-endian keeps byte order equal to numeric order, so iterating the
/// bucket in key order is iterating in ascending id order. `list` depends
/// on this.
pub fn encode_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Inverse of `encode_key`; None if the key is not 8 bytes.
pub fn decode_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
