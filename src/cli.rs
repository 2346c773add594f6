use clap::Parser;
use std::path::PathBuf;

/// Command-line interface for the usage dashboard.
#[derive(Debug, Parser)]
#[command(author, version, about = "Usage-log aggregation dashboard", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file (defaults to ./usage-dashboard.toml if present).
    #[arg(long, value_name = "FILE")]
    pub config_path: Option<PathBuf>,
    /// Print the usage summary as JSON and exit instead of serving the dashboard.
    #[arg(long)]
    pub summary: bool,
}
