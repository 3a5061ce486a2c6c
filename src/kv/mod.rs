//! Embedded ordered key-value engine for echodb
//!
//! A single-file, log-structured store with transactional semantics:
//!
//! - Named buckets (independent keyed namespaces)
//! - Keys iterate in ascending byte order
//! - Per-bucket persisted sequence counters that never rewind
//! - Read-only transactions observe a consistent snapshot
//! - Read-write transactions are serialized and commit atomically
//!   (one appended commit frame, fsynced before it becomes visible)
//!
//! The data directory is exclusively owned by one process at a time,
//! enforced with an OS-level file lock acquired at open.

mod engine;
mod errors;
mod frame;
mod lock;
mod log;

pub use engine::{BucketView, Engine, ReadTx, WriteTx};
pub use errors::{EngineError, EngineResult};
pub use frame::{CommitFrame, FrameSizeError, LogOp};
pub use lock::DataDirLock;
