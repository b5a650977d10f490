//! CLI argument definitions for the TEFAS exporter.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Fetch full records for the catalog and export them |
//! | `update` | Refresh an existing raw export with recent prices |
//! | `process` | Build the processed export from a raw export |
//! | `issuers` | List issuer codes and names |
//!
//! # Examples
//!
//! ```bash
//! # Listed funds with one year of prices
//! tefas fetch --listed-only --range 1y --output data/
//!
//! # Two issuers only
//! tefas fetch --issuers AKP IYP
//!
//! # Incremental refresh of yesterday's export
//! tefas update --input data/fund_data_raw.csv --output data/
//! ```
//!
//! Runtime settings not exposed as flags come from `TEFAS_*` environment
//! variables; flags win when both are set.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tefas_core::TimeFrame;

/// TEFAS fund data exporter
#[derive(Debug, Parser)]
#[command(
    name = "tefas",
    author,
    version,
    about = "Fetch, update and export TEFAS mutual fund data"
)]
pub struct Cli {
    /// Pretty-print the JSON run summary.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Attempts per request before giving up.
    #[arg(long, global = true)]
    pub retry_attempts: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch full fund records and write the raw and processed exports.
    ///
    /// # Examples
    ///
    ///   tefas fetch
    ///   tefas fetch --range 6m --listed-only
    ///   tefas fetch --issuers AKP --max-workers 4
    Fetch(FetchArgs),

    /// Merge recent prices into an existing raw export.
    ///
    /// Funds that appeared since the export are fetched in full.
    Update(UpdateArgs),

    /// Rebuild the processed export from a raw export without network access.
    Process(ProcessArgs),

    /// Print the issuer directory.
    Issuers,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Keep only prices within this span before today (e.g. 30d, 2w, 6m, 1y).
    #[arg(long)]
    pub range: Option<TimeFrame>,

    /// Restrict the catalog to these issuer codes.
    #[arg(long, num_args = 1.., conflicts_with = "listed_only")]
    pub issuers: Vec<String>,

    /// Only funds currently traded on the platform.
    #[arg(long, default_value_t = false)]
    pub listed_only: bool,

    #[command(flatten)]
    pub export: ExportArgs,

    #[arg(long)]
    pub max_workers: Option<usize>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Raw export to refresh.
    #[arg(long)]
    pub input: PathBuf,

    /// Days before the latest stored price to re-fetch.
    #[arg(long)]
    pub margin_days: Option<u32>,

    #[command(flatten)]
    pub export: ExportArgs,

    #[arg(long)]
    pub max_workers: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Raw export to read.
    #[arg(long)]
    pub input: PathBuf,

    /// Directory for the processed export.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,
}

/// Where and what to write after a network run.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Directory for `fund_data_raw.csv` and `fund_data.csv`.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,

    /// Skip the processed export.
    #[arg(long, default_value_t = false)]
    pub no_processed: bool,
}
