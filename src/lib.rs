//! echodb - an embedded message store with a REST front door
//!
//! Strictly layered: `kv` is the file-backed ordered key-value engine,
//! `message` owns the record codec and the four data operations, and
//! `http_server` renders those operations over HTTP.

pub mod cli;
pub mod http_server;
pub mod kv;
pub mod message;
pub mod observability;
