//! pupilfit CLI entry point.

use clap::Parser;

use pupilfit::cli::{Cli, Commands};
use pupilfit::infrastructure::config::ConfigLoader;
use pupilfit::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => pupilfit::cli::handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => pupilfit::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Run(args) => pupilfit::cli::commands::run::execute(args, config, cli.json).await,
        Commands::Catalog => pupilfit::cli::commands::catalog::execute(cli.json),
        Commands::Config => pupilfit::cli::commands::config::execute(config, cli.json),
    };

    if let Err(err) = result {
        pupilfit::cli::handle_error(err, cli.json);
    }
}
