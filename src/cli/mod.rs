//! CLI for echodb
//!
//! One command: `serve`, which opens the store and runs the HTTP service
//! until stopped. All process wiring lives here so main.rs stays trivial.

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{run, serve};
pub use errors::{CliError, CliResult};
