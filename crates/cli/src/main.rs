//! lastmod entry point.
//!
//! Fetches one URL through the conditional-GET cache and prints the body.
//! Logging goes to stderr so stdout carries only the payload.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use lastmod_client::CacheManager;
use lastmod_core::{AppConfig, ConfigOverrides};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides { cache_path: cli.cache_path, db: cli.db };
    let config = AppConfig::load_with(cli.config.as_deref(), &overrides)?;
    let manager = CacheManager::new(&config)?;

    let fetched = manager.fetch(cli.url.as_str()).await?;
    tracing::info!(url = %cli.url, fresh = fetched.is_fresh(), bytes = fetched.bytes().len(), "done");

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", String::from_utf8_lossy(fetched.bytes()))?;
    stdout.flush()?;

    Ok(())
}
