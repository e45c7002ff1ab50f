//! File output operations for scan reports.
//!
//! Handles writing reports to files with optional compression. Every
//! report is validated against the report schema and checked for token
//! leakage before anything touches the disk.

use appsurveyor_core::{AppSurveyorError, Result, ScanReport, validate_report_output};
use std::path::Path;

/// Validates a report and saves it, optionally compressed.
///
/// `secrets` are the access token values that must not appear in the
/// output.
pub async fn save_report(
    report: &ScanReport,
    output_path: &Path,
    compress: bool,
    secrets: &[&str],
) -> Result<()> {
    // Serialize to JSON
    let json_data = serde_json::to_string_pretty(report)
        .map_err(|e| AppSurveyorError::serialization("Report serialization", e))?;

    // Validate output against JSON Schema before saving
    let json_value: serde_json::Value = serde_json::from_str(&json_data)
        .map_err(|e| AppSurveyorError::serialization("JSON parsing for validation", e))?;

    validate_report_output(&json_value, secrets).map_err(|e| {
        AppSurveyorError::configuration(format!("Report validation failed: {}", e))
    })?;

    tracing::info!("Output validation passed");

    if compress {
        #[cfg(feature = "compression")]
        {
            save_compressed(&json_data, output_path).await
        }
        #[cfg(not(feature = "compression"))]
        {
            Err(AppSurveyorError::configuration(
                "Compression not available. Compile with --features compression",
            ))
        }
    } else {
        save_json(&json_data, output_path).await
    }
}

/// Saves JSON data to file.
pub async fn save_json(json_data: &str, output_path: &Path) -> Result<()> {
    tokio::fs::write(output_path, json_data)
        .await
        .map_err(|e| AppSurveyorError::Io {
            context: format!("Failed to write to {}", output_path.display()),
            source: e,
        })?;
    Ok(())
}

/// Saves compressed JSON data.
#[cfg(feature = "compression")]
async fn save_compressed(json_data: &str, output_path: &Path) -> Result<()> {
    use std::io::Write;

    let mut encoder = zstd::Encoder::new(Vec::new(), 3).map_err(|e| {
        AppSurveyorError::configuration(format!("Failed to create compressor: {}", e))
    })?;

    encoder
        .write_all(json_data.as_bytes())
        .map_err(|e| AppSurveyorError::configuration(format!("Compression failed: {}", e)))?;

    let compressed_data = encoder.finish().map_err(|e| {
        AppSurveyorError::configuration(format!("Compression finalization failed: {}", e))
    })?;

    tokio::fs::write(output_path, compressed_data)
        .await
        .map_err(|e| AppSurveyorError::Io {
            context: format!(
                "Failed to write compressed file to {}",
                output_path.display()
            ),
            source: e,
        })?;

    Ok(())
}
