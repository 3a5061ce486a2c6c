//! Command dispatch.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use crate::http_server::{HttpConfig, HttpServer};
use crate::kv::Engine;
use crate::message::MessageStore;
use crate::observability::{Logger, Severity};

use super::args::{Cli, Command};
use super::errors::CliResult;

/// Parse arguments and run the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            data_dir,
            host,
            port,
            static_dir,
        } => {
            let mut config = HttpConfig::default();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(static_dir) = static_dir {
                config.static_dir = static_dir;
            }
            serve(&data_dir, config)
        }
    }
}

/// Open the store and serve until stopped.
///
/// Any initialization failure (directory lock, log replay, bucket
/// creation) is returned to main and terminates the process.
pub fn serve(data_dir: &Path, config: HttpConfig) -> CliResult<()> {
    let engine = Arc::new(Engine::open(data_dir)?);
    Logger::log(
        Severity::Info,
        "store_opened",
        &[("path", &engine.path().display().to_string())],
    );

    let store = MessageStore::open(engine)?;
    let server = HttpServer::new(store, config);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}
