//! CLI argument definitions using clap derive.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Fetch a URL, revalidating a locally cached copy with If-Modified-Since.
///
/// The body is written to stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "lastmod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// URL to fetch
    pub url: String,

    /// TOML config file with a [lastmod] section
    #[arg(short, long, env = "LASTMOD_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Parent directory for cached payload files
    #[arg(short = 'p', long)]
    pub cache_path: Option<PathBuf>,

    /// SQLite database for response metadata
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug); ignored when RUST_LOG is set
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}
