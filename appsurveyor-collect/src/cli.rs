//! Command-line interface definition.

use crate::overrides::OverrideSpec;
use appsurveyor_core::LogFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "appsurveyor-collect")]
#[command(about = "Low-code application data-exposure scanner")]
#[command(version)]
#[command(long_about = "
AppSurveyor Collector - find sensitive data exposed by low-code app backends

This tool discovers the data tables an application's backend exposes,
samples their records, and classifies which fields carry personal or
business information:
- Table discovery from the application's schema description
- Record counts per table (exact, or a lower bound for large tables)
- Per-column sensitivity classification with manual overrides
- A ranked summary of the most exposed tables

SECURITY FEATURES:
- Access tokens are never logged or written to reports
- Reports are validated for token leakage before they are saved
- Hidden interactive token input

EXAMPLES:
  appsurveyor-collect scan https://myapp.bubbleapps.io
  appsurveyor-collect scan --share-link 'https://scan.example.com/?x=...&y=...' myapp.bubbleapps.io
  appsurveyor-collect scan --override user.email=low --compress myapp.bubbleapps.io
  appsurveyor-collect tables myapp.bubbleapps.io
  appsurveyor-collect view myapp.bubbleapps.io user
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover, count, and classify every table
    Scan(ScanArgs),
    /// Discover tables and count their records
    Tables(TablesArgs),
    /// Sample one table and show per-column sensitivity
    View(ViewArgs),
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Log line format
    #[arg(
        long,
        global = true,
        default_value = "text",
        env = "APPSURVEYOR_LOG_FORMAT",
        help = "Log format (text or json)"
    )]
    pub log_format: LogFormat,

    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "APPSURVEYOR_CONFIG",
        help = "TOML configuration file (defaults are used when omitted)"
    )]
    pub config: Option<PathBuf>,
}

/// Target application and access tokens.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Application URL
    #[arg(help = "Application URL (scheme optional, query string ignored)")]
    pub app_url: String,

    /// First access token
    #[arg(long = "token-x", env = "APPSURVEYOR_TOKEN_X", hide_env_values = true)]
    pub token_x: Option<String>,

    /// Second access token
    #[arg(long = "token-y", env = "APPSURVEYOR_TOKEN_Y", hide_env_values = true)]
    pub token_y: Option<String>,

    /// Share link carrying both tokens in its query string
    #[arg(long, value_name = "URL", help = "Share link of the form https://...?x=...&y=...")]
    pub share_link: Option<String>,

    /// Never prompt for missing tokens
    #[arg(long, help = "Fail instead of prompting when tokens are missing")]
    pub no_prompt: bool,

    /// Concurrent tables per batch
    #[arg(long, value_name = "N", help = "Tables classified concurrently per batch")]
    pub batch_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output file path
    #[arg(
        short,
        long,
        default_value = "scan.appsurveyor.json",
        help = "Output file path (.json or .json.zst)"
    )]
    pub output: PathBuf,

    /// Enable compression
    #[arg(long, help = "Compress output using Zstandard (.json.zst)")]
    pub compress: bool,

    /// Manual sensitivity overrides
    #[arg(
        long = "override",
        value_name = "TABLE.COLUMN=LABEL",
        help = "Force a column's sensitivity (low, moderate, high); repeatable"
    )]
    pub overrides: Vec<OverrideSpec>,
}

#[derive(Args, Debug)]
pub struct TablesArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Table to view
    #[arg(help = "Table id as listed by the tables command")]
    pub table: String,

    /// Print the view as JSON
    #[arg(long)]
    pub json: bool,
}
