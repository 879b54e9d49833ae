//! CLI module for ipgeo
//!
//! This module handles command line argument parsing and query logic.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use ipgeo::output;
use ipgeo::{AppConfig, BackendRegistry, BatchResolver, FieldNormalizer, Resolution, ResolutionCoordinator};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ipgeo")]
#[command(version, about = "Offline IP geolocation lookup across several databases at once")]
#[command(long_about = "ipgeo resolves IP addresses against every configured offline \
    database (GeoLite2, DB-IP, IP2Location, ip2region) and prints each answer side by side.\n\n\
    Addresses come from the command line, a pipe, or an interactive prompt. \
    At most 10 addresses are resolved per batch.\n\n\
    Examples:\n  \
    $ ipgeo 8.8.8.8 2001:4860:4860::8888\n  \
    $ printf '1.1.1.1\\n8.8.8.8\\n' | ipgeo --json\n  \
    $ ipgeo -b geolite2 -b ip2region 114.114.114.114\n  \
    $ ipgeo --list")]
pub struct Cli {
    /// IP addresses (read from standard input when omitted)
    #[arg(value_name = "IP")]
    pub queries: Vec<String>,

    /// Output JSON
    #[arg(short, long)]
    pub json: bool,

    /// Only query this backend (repeatable)
    #[arg(short, long = "backend", value_name = "ID")]
    pub backends: Vec<String>,

    /// Configuration file to use instead of the default one
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// List configured backends and whether they loaded
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    /// Log level from `-v` occurrences, raised to info by `global.verbose`
    pub fn log_level(&self, config: &AppConfig) -> log::LevelFilter {
        match self.verbose {
            0 if config.global.verbose => log::LevelFilter::Info,
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }

    pub async fn run(&self, mut config: AppConfig) -> Result<()> {
        // Apply CLI options to config
        if self.json {
            config.output.json = true;
        }

        let backends = config
            .resolved_backends()
            .context("Failed to resolve database directory")?;
        let normalizer = FieldNormalizer::new(&config.database.locales)
            .context("Invalid locale in configuration")?;
        let registry = Arc::new(BackendRegistry::open(&backends, normalizer.candidates()));
        let resolver = BatchResolver::new(ResolutionCoordinator::new(registry.clone(), normalizer));

        if self.list {
            self.print_registry(&registry);
            return Ok(());
        }

        if !self.queries.is_empty() {
            // Arguments form a single batch
            let raw = self.queries.join("\n");
            let resolutions = resolver.resolve_batch(&raw, &self.backends).await;
            self.print(&resolutions, &config)?;
        } else if atty::is(atty::Stream::Stdin) {
            self.interactive(&resolver, &config).await?;
        } else {
            // Pipe mode - the whole input is one batch
            let mut buffer = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut buffer)
                .context("Failed to read standard input")?;
            let resolutions = resolver.resolve_batch(&buffer, &self.backends).await;
            self.print(&resolutions, &config)?;
        }

        Ok(())
    }

    /// Resolve one line at a time until quit, exit or EOF
    async fn interactive(&self, resolver: &BatchResolver, config: &AppConfig) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        println!("ipgeo interactive mode (type quit or Ctrl+D to exit)");
        print!("> ");
        stdout.flush()?;

        for line in stdin.lock().lines() {
            let line = line?;
            let trimmed = line.trim();

            if trimmed == "quit" || trimmed == "exit" {
                break;
            }

            if !trimmed.is_empty() {
                let resolutions = resolver.resolve_batch(trimmed, &self.backends).await;
                self.print(&resolutions, config)?;
            }

            print!("> ");
            stdout.flush()?;
        }

        Ok(())
    }

    fn print(&self, resolutions: &[Resolution], config: &AppConfig) -> Result<()> {
        if config.output.json {
            println!("{}", output::format_json(resolutions)?);
        } else {
            let use_color = config.output.enable_colors && atty::is(atty::Stream::Stdout);
            print!("{}", output::format_text(resolutions, use_color));
        }
        Ok(())
    }

    fn print_registry(&self, registry: &BackendRegistry) {
        for descriptor in registry.descriptors() {
            let status = match &descriptor.load_error {
                None => "loaded".to_string(),
                Some(e) => format!("unavailable: {}", e),
            };
            println!(
                "{:<16} {:<14} {:<5} {}",
                descriptor.id,
                descriptor.kind.to_string(),
                descriptor.family.to_string(),
                status
            );
        }
    }
}
