//! CLI interface for unusual-flow
//!
//! Provides subcommands for:
//! - `scan`: Scan tickers for unusual options activity
//! - `sweep`: Deactivate expired or stale stored signals
//! - `status`: Show stored signal state
//! - `config`: Show the effective configuration

mod output;
mod scan;
mod status;
mod sweep;

pub use output::OutputFormat;
pub use scan::ScanArgs;
pub use status::StatusArgs;
pub use sweep::SweepArgs;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "unusual-flow")]
#[command(about = "Unusual options activity scanner")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan tickers and record signals
    Scan(ScanArgs),
    /// Deactivate expired or stale signals
    Sweep(SweepArgs),
    /// Show stored signals
    Status(StatusArgs),
    /// Show configuration
    Config,
}
