//! Main entry point for the ipgeo CLI tool

use anyhow::Context;
use clap::Parser;
use log::info;

mod cli;

use cli::Cli;
use ipgeo::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}, using defaults", e);
            AppConfig::default()
        }),
    };

    // Initialize logging; RUST_LOG still wins when set
    env_logger::Builder::new()
        .filter_level(cli.log_level(&config))
        .parse_env("RUST_LOG")
        .init();

    info!("Starting ipgeo v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config.global.config_path {
        info!("Using configuration {:?}", path);
    }

    // Execute CLI logic
    cli.run(config).await
}
