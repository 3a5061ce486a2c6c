//! Message domain for echodb
//!
//! A message is a short immutable text with a store-assigned id, a creation
//! timestamp, and a derived palindrome flag. This module owns the record
//! codec, the palindrome derivation, and the `MessageStore` that maps the
//! four data operations (list, get, create, delete) onto kv transactions.

mod errors;
mod palindrome;
mod record;
mod store;

pub use errors::{CorruptRecord, StoreError, StoreResult};
pub use palindrome::is_palindrome;
pub use record::{decode_key, encode_key, Message};
pub use store::{MessageStore, MESSAGES_BUCKET};
