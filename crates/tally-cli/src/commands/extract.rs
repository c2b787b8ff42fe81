//! Extract command - reconcile the amounts of a single receipt.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use tally_core::{ReceiptParser, TallyParser};

use super::{OutputFormat, format_result, load_config, read_input};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// OCR dump: JSON lines or plain recognized text
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Check the extracted amounts for inconsistencies
    #[arg(long)]
    validate: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting amounts from {}", args.input.display());

    let input = read_input(&args.input)?;
    let parser = TallyParser::new().with_config(config.extraction);
    let result = parser.parse(&input)?;

    if args.validate {
        let issues = result.amounts.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if result.needs_verification {
        eprintln!(
            "{} Amounts need manual verification (consistency {:.2})",
            style("!").yellow(),
            result.consistency_score
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
