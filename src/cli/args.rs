//! Argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// echodb: an embedded message store with a REST front door.
#[derive(Debug, Parser)]
#[command(name = "echodb", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the store and serve the HTTP API and front-end.
    Serve {
        /// Data directory holding the database file and lock.
        #[arg(long, default_value = "db")]
        data_dir: PathBuf,

        /// Host to bind.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind.
        #[arg(long)]
        port: Option<u16>,

        /// Directory with the bundled front-end assets.
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_with_defaults() {
        let cli = Cli::try_parse_from(["echodb", "serve"]).unwrap();
        let Command::Serve {
            data_dir,
            host,
            port,
            static_dir,
        } = cli.command;
        assert_eq!(data_dir, PathBuf::from("db"));
        assert!(host.is_none());
        assert!(port.is_none());
        assert!(static_dir.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "echodb", "serve", "--data-dir", "/tmp/x", "--port", "9090",
        ])
        .unwrap();
        let Command::Serve { data_dir, port, .. } = cli.command;
        assert_eq!(data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(port, Some(9090));
    }
}
