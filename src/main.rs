//! Upkeep CLI entry point.

use anyhow::Result;
use clap::Parser;

use upkeep::cli::{commands, handle_error, Cli, Commands};
use upkeep::domain::models::config::Config;
use upkeep::infrastructure::config::ConfigLoader;
use upkeep::infrastructure::logging::{LogConfig, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let config = load_config(&cli).unwrap_or_else(|err| handle_error(err, json_mode));
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))
        .unwrap_or_else(|err| handle_error(err, json_mode));

    let result = match cli.command {
        Commands::Preview(args) => commands::preview::execute(args, &config, json_mode).await,
        Commands::Plan(args) => commands::plan::execute(args, &config, json_mode).await,
        Commands::Materialize(args) => commands::materialize::execute(args, &config, json_mode).await,
        Commands::Daemon(args) => commands::daemon::execute(args, &config, json_mode).await,
    };

    if let Err(err) = result {
        handle_error(err, json_mode);
    }
}
