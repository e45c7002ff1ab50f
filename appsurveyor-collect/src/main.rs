//! Low-code application data-exposure scanner.
//!
//! This binary discovers the data tables a low-code application's backend
//! exposes, samples their records, and classifies which columns carry
//! sensitive information. It operates with security-first principles.
//!
//! # Security Guarantees
//! - Read-only requests to the application backend
//! - Access tokens never logged or written to reports
//! - Reports validated for token leakage before saving
//! - Optional Zstandard compression for outputs

use appsurveyor_collect::{
    Cli, Command,
    scan::{run_scan, run_tables, run_view},
};
use appsurveyor_core::{AppSurveyorError, Result, init_logging, initialize_report_validator};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format)?;

    // Initialize JSON Schema validator
    initialize_report_validator().map_err(|e| {
        AppSurveyorError::configuration(format!("Failed to initialize report validator: {}", e))
    })?;

    let config = cli.global.config.as_deref();
    match &cli.command {
        Command::Scan(args) => run_scan(config, args).await,
        Command::Tables(args) => run_tables(config, args).await,
        Command::View(args) => run_view(config, args).await,
    }
}
