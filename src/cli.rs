//! Command-line interface definitions.
//!
//! Every option can come from a flag or, where noted, an environment variable.

use civic_pulse::config::{Lookback, Mode};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one aggregation run.
///
/// # Examples
///
/// ```sh
/// # Hourly alerts into ./feed
/// civic_pulse --mode hourly -o ./feed
///
/// # Daily run with a custom catalog, only printing the planned work
/// civic_pulse --mode daily --config sources.yaml --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Which set of sources to run
    #[arg(long, value_enum, default_value_t = Mode::Hourly)]
    pub mode: Mode,

    /// Optional path to a settings YAML file (defaults to the built-in catalog)
    #[arg(short, long, env = "CIVIC_PULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output directory for the JSON files
    #[arg(short, long, default_value = "./output")]
    pub output_dir: String,

    /// Override the worker-pool ceiling
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override the mode's maximum result count
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Override the mode's lookback (`today`, `3d`, `all`)
    #[arg(long)]
    pub lookback: Option<Lookback>,

    /// Print the planned work items and exit without fetching
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
