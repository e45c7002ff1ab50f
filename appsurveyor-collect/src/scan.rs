//! Wiring of the HTTP collaborators and the CLI commands.

use crate::output::save_report;
use crate::overrides::OverrideSpec;
use crate::render::{TableListing, render_report, render_tables, render_view};
use crate::tokens::resolve_tokens;
use crate::{ScanArgs, TablesArgs, TargetArgs, ViewArgs};
use appsurveyor_core::{
    AccessTokens, AppSurveyorError, Collaborators, Result, ScanOrchestrator, ScanReport,
    SurveyorConfig,
    adapters::{HttpDataAccess, HttpSchemaSource, build_http_client},
    error::redact_url,
    oracle::ChatOracle,
    orchestrator::LoggingObserver,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Loads the configuration file (or defaults) and applies CLI overrides.
pub fn load_config(path: Option<&Path>, batch_size: Option<usize>) -> Result<SurveyorConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            SurveyorConfig::load(path)?
        }
        None => SurveyorConfig::default(),
    };
    if let Some(size) = batch_size {
        config.scan = config.scan.with_batch_size(size);
    }
    config.validate()?;
    Ok(config)
}

/// Builds an orchestrator backed by the configured HTTP services.
pub fn build_orchestrator(
    config: &SurveyorConfig,
    tokens: AccessTokens,
) -> Result<ScanOrchestrator> {
    let client = build_http_client(config.endpoints.request_timeout_secs)?;
    let oracle = Arc::new(ChatOracle::from_config(
        client.clone(),
        &config.endpoints.oracle,
    )?);

    let collaborators = Collaborators {
        schema: Arc::new(HttpSchemaSource::from_config(
            client.clone(),
            &config.endpoints,
        )),
        data: Arc::new(HttpDataAccess::from_config(
            client,
            &config.endpoints,
            tokens,
        )),
        classification: oracle.clone(),
        prioritization: oracle,
    };

    Ok(ScanOrchestrator::new(collaborators, config.scan.clone())?
        .with_observer(Arc::new(LoggingObserver)))
}

/// Runs a full scan, applies manual overrides, and returns the report.
///
/// Overrides are applied after classification so they may target columns
/// discovered from sampled records; the summary is refreshed afterwards.
pub async fn scan_with_overrides(
    orchestrator: &ScanOrchestrator,
    app_url: &str,
    overrides: &[OverrideSpec],
) -> Result<ScanReport> {
    orchestrator.discover_tables(app_url).await?;
    orchestrator.scan_sensitivity().await?;

    if !overrides.is_empty() {
        for spec in overrides {
            orchestrator
                .set_override(&spec.table, &spec.column, spec.label)
                .await?;
        }
        orchestrator.refresh_summary().await?;
    }

    orchestrator.report().await
}

fn prepare(
    config_path: Option<&Path>,
    target: &TargetArgs,
) -> Result<(SurveyorConfig, AccessTokens)> {
    let config = load_config(config_path, target.batch_size)?;
    let (tokens, source) = resolve_tokens(
        target.token_x.clone(),
        target.token_y.clone(),
        target.share_link.as_deref(),
        !target.no_prompt,
    )?;
    info!("Access tokens loaded from {}", source);
    Ok((config, tokens))
}

/// Runs the `scan` command.
pub async fn run_scan(config_path: Option<&Path>, args: &ScanArgs) -> Result<()> {
    let (config, tokens) = prepare(config_path, &args.target)?;
    // Kept for the leak check; the data adapter takes ownership of a copy.
    let secrets = tokens.clone();
    let orchestrator = build_orchestrator(&config, tokens)?;

    info!("Starting scan...");
    info!("Target: {}", redact_url(&args.target.app_url));
    info!("Output: {}", args.output.display());

    let report = scan_with_overrides(&orchestrator, &args.target.app_url, &args.overrides)
        .await
        .map_err(|e| {
            error!("Scan failed: {}", e);
            e
        })?;

    save_report(&report, &args.output, args.compress, &secrets.secrets()).await?;

    info!("✓ Report saved to {}", args.output.display());
    println!("Scan completed successfully");
    println!("Output: {}", args.output.display());
    print!("{}", render_report(&report));
    Ok(())
}

/// Runs the `tables` command.
pub async fn run_tables(config_path: Option<&Path>, args: &TablesArgs) -> Result<()> {
    let (config, tokens) = prepare(config_path, &args.target)?;
    let orchestrator = build_orchestrator(&config, tokens)?;

    let tables = orchestrator.discover_tables(&args.target.app_url).await?;
    if args.json {
        let listing: Vec<TableListing<'_>> = tables.iter().map(TableListing::from_table).collect();
        let text = serde_json::to_string_pretty(&listing)
            .map_err(|e| AppSurveyorError::serialization("Table listing", e))?;
        println!("{}", text);
    } else {
        print!("{}", render_tables(&tables));
    }
    Ok(())
}

/// Runs the `view` command.
pub async fn run_view(config_path: Option<&Path>, args: &ViewArgs) -> Result<()> {
    let (config, tokens) = prepare(config_path, &args.target)?;
    let orchestrator = build_orchestrator(&config, tokens)?;

    orchestrator.discover_tables(&args.target.app_url).await?;
    let view = orchestrator.view_table(&args.table).await?;
    if args.json {
        let text = serde_json::to_string_pretty(&view)
            .map_err(|e| AppSurveyorError::serialization("Table view", e))?;
        println!("{}", text);
    } else {
        print!("{}", render_view(&view));
    }
    Ok(())
}
