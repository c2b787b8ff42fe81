//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tracing::debug;

use tally_core::models::config::TallyConfig;
use tally_core::receipt::rules::format_amount;
use tally_core::{ExtractionResult, ReceiptInput, TextLine};

/// Output format of extraction results.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("config.json")
}

/// Configuration from `--config`, else the default file if present, else
/// built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TallyConfig> {
    if let Some(path) = config_path {
        return Ok(TallyConfig::from_file(Path::new(path))?);
    }
    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(TallyConfig::from_file(&default_path)?)
    } else {
        Ok(TallyConfig::default())
    }
}

/// Read one OCR dump.
///
/// `.json` files hold a `ReceiptInput` object or a bare array of lines; any
/// other file is taken as flat recognized text.
pub fn read_input(path: &Path) -> anyhow::Result<ReceiptInput> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if !is_json {
        return Ok(ReceiptInput::from_text(content));
    }

    let value: serde_json::Value = serde_json::from_str(&content)?;
    let input = if value.is_array() {
        let lines: Vec<TextLine> = serde_json::from_value(value)?;
        ReceiptInput::from_lines(lines)
    } else {
        serde_json::from_value(value)?
    };
    Ok(input)
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_text(result: &ExtractionResult) -> String {
    let show = |value: Option<Decimal>| {
        value
            .map(format_amount)
            .unwrap_or_else(|| "-".to_string())
    };
    let amounts = &result.amounts;
    let mut output = String::new();

    output.push_str(&format!("Subtotal: {}\n", show(amounts.subtotal)));
    output.push_str(&format!("Tax:      {}\n", show(amounts.tax)));
    output.push_str(&format!("Total:    {}\n", show(amounts.total)));

    if !amounts.tax_breakdown.is_empty() {
        output.push_str("\nTax breakdown:\n");
        for entry in &amounts.tax_breakdown {
            output.push_str(&format!("  {}\n", entry.display()));
        }
    }

    output.push_str(&format!("\nConsistency: {:.2}\n", result.consistency_score));
    if result.needs_verification {
        output.push_str("Needs verification\n");
    }
    for warning in &result.warnings {
        output.push_str(&format!("Warning: {}\n", warning));
    }

    output
}
