//! Structured logging for echodb.

mod logger;

pub use logger::{Logger, Severity};
