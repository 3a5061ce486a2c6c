//! CLI error types.

use std::io;

use thiserror::Error;

use crate::kv::EngineError;
use crate::message::StoreError;

/// Anything that can abort the process from the CLI layer.
#[derive(Debug, Error)]
pub enum CliError {
    /// The engine could not open its data directory. Fatal: the service
    /// cannot run without its store.
    #[error("failed to open store: {0}")]
    Engine(#[from] EngineError),

    /// Store initialization failed after the engine opened.
    #[error("failed to initialize store: {0}")]
    Store(#[from] StoreError),

    /// The server could not bind or crashed while serving.
    #[error("server error: {0}")]
    Server(#[from] io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
