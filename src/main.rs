//! fonpick CLI entry point.

use anyhow::Result;
use clap::Parser;

use fonpick::cli::commands;
use fonpick::cli::{Cli, Commands, ConfigCommands};
use fonpick::infrastructure::config::ConfigLoader;
use fonpick::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        fonpick::cli::handle_error(&err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load_optional(cli.config.as_deref())?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Serve { host, port } => commands::serve::handle_serve(config, host, port).await,
        Commands::Fetch {
            symbol,
            resource,
            years,
            nocache,
        } => commands::fetch::handle_fetch(&config, symbol, &resource, years, nocache, cli.json).await,
        Commands::Config(ConfigCommands::Show) => commands::config::handle_show(&config, cli.json),
    }
}
