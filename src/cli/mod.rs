//! Command-line interface.

pub mod commands;
pub mod types;

pub use types::{Cli, Commands, ConfigCommands};

/// Print a command error and exit with a failure status.
pub fn handle_error(err: &anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
