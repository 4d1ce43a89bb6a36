//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fonpick")]
#[command(about = "fonpick - cached proxy for Thai stock market data", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file used instead of fonpick.yaml / fonpick.local.yaml
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP proxy
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch one resource through the proxy pipeline and print the envelope
    Fetch {
        /// Stock symbol, e.g. PTT
        symbol: String,

        /// overview, statistics, valuation, quarterly, yearly or verdict
        resource: String,

        /// Valuation look-back in years (clamped to 1-10)
        #[arg(short, long)]
        years: Option<u32>,

        /// Skip the cache read
        #[arg(long)]
        nocache: bool,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::parse_from([
            "fonpick", "fetch", "ptt", "valuation", "--years", "3", "--nocache",
        ]);
        match cli.command {
            Commands::Fetch {
                symbol,
                resource,
                years,
                nocache,
            } => {
                assert_eq!(symbol, "ptt");
                assert_eq!(resource, "valuation");
                assert_eq!(years, Some(3));
                assert!(nocache);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["fonpick", "serve", "--config", "prod.yaml", "--port", "9000"]);
        assert_eq!(cli.config, Some(PathBuf::from("prod.yaml")));
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000), host: None }));
    }
}
