//! echodb entry point.
//!
//! All logic is delegated to the CLI module; this only reports failure
//! and sets the exit code.

use echodb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
