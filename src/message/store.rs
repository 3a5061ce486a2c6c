//! The message store: list / get / create / delete over one bucket.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::kv::Engine;

use super::errors::{StoreError, StoreResult};
use super::palindrome::is_palindrome;
use super::record::{encode_key, Message};

/// The single collection holding every message record.
pub const MESSAGES_BUCKET: &str = "messages";

/// Message operations over a shared engine handle.
///
/// Cheap to clone; all clones share the one engine and its file lock.
/// Validation of caller input (e.g. rejecting empty text) is the HTTP
/// boundary's job — the store persists whatever it is given.
#[derive(Clone)]
pub struct MessageStore {
    engine: Arc<Engine>,
}

impl MessageStore {
    /// Open the store, idempotently ensuring the messages bucket exists.
    pub fn open(engine: Arc<Engine>) -> StoreResult<Self> {
        engine.update(|tx| {
            tx.create_bucket_if_missing(MESSAGES_BUCKET)?;
            Ok::<_, StoreError>(())
        })?;
        Ok(Self { engine })
    }

    /// All messages in ascending id order. An empty collection is an empty
    /// vec, never an error; a single undecodable record fails the whole
    /// listing rather than returning partial results.
    pub fn list(&self) -> StoreResult<Vec<Message>> {
        self.engine.view(|tx| {
            let bucket = tx.bucket(MESSAGES_BUCKET)?;
            let mut messages = Vec::with_capacity(bucket.len());
            for (_, value) in bucket.iter() {
                messages.push(Message::decode(value)?);
            }
            Ok(messages)
        })
    }

    /// Fetch one message by id.
    pub fn get(&self, id: u64) -> StoreResult<Message> {
        self.engine.view(|tx| {
            let bucket = tx.bucket(MESSAGES_BUCKET)?;
            match bucket.get(&encode_key(id)) {
                Some(bytes) => Ok(Message::decode(bytes)?),
                None => Err(StoreError::not_found(id)),
            }
        })
    }

    /// Persist a new message.
    ///
    /// One transaction covers id allocation, timestamping, derivation, and
    /// the write, so no reader ever observes a partially created message.
    /// Ids come from the bucket's persisted counter: strictly increasing,
    /// never reused, gaps from deletion expected.
    pub fn create(&self, text: &str) -> StoreResult<Message> {
        self.engine.update(|tx| {
            let id = tx.next_sequence(MESSAGES_BUCKET)?;
            let message = Message {
                id,
                message: text.to_string(),
                is_palindrome: is_palindrome(text),
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            };
            tx.put(
                MESSAGES_BUCKET,
                encode_key(id).to_vec(),
                message.encode()?,
            )?;
            Ok(message)
        })
    }

    /// Remove a message by id. Deleting an absent id is `NotFound`, not a
    /// silent no-op.
    pub fn delete(&self, id: u64) -> StoreResult<()> {
        self.engine.update(|tx| {
            let key = encode_key(id);
            if tx.get(MESSAGES_BUCKET, &key)?.is_none() {
                return Err(StoreError::not_found(id));
            }
            tx.delete(MESSAGES_BUCKET, key.to_vec())?;
            Ok(())
        })
    }
}
