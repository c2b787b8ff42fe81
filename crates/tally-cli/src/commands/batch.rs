//! Batch processing command for multiple OCR dumps.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use tally_core::{ExtractionResult, Field, ReceiptParser, TallyParser};

use super::{OutputFormat, format_result, load_config, read_input};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileOutcome {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = Arc::new(TallyParser::new().with_config(config.extraction));
    let jobs = args.jobs.max(1);
    let mut pending = files.into_iter().enumerate();
    let mut running = JoinSet::new();
    let mut outcomes: Vec<(usize, FileOutcome)> = Vec::new();

    loop {
        while running.len() < jobs {
            let Some((index, path)) = pending.next() else {
                break;
            };
            let parser = Arc::clone(&parser);
            running.spawn_blocking(move || (index, process_single_file(path, &parser)));
        }

        let Some(joined) = running.join_next().await else {
            break;
        };
        let (index, outcome) = joined?;
        progress.inc(1);

        if let Some(message) = &outcome.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", outcome.path.display(), message);
            } else {
                error!("Failed to process {}: {}", outcome.path.display(), message);
                running.abort_all();
                progress.abandon();
                anyhow::bail!("Processing failed: {}", message);
            }
        }
        outcomes.push((index, outcome));
    }

    progress.finish_with_message("Complete");

    outcomes.sort_by_key(|(index, _)| *index);
    let outcomes: Vec<FileOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();

    if let Some(output_dir) = &args.output_dir {
        for outcome in &outcomes {
            let Some(result) = &outcome.result else {
                continue;
            };
            let output_name = outcome
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("receipt");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));
            fs::write(&output_path, format_result(result, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| o.error.is_some()).collect();
    let flagged = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_some_and(|r| r.needs_verification))
        .count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} need verification",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red(),
        style(flagged).yellow()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(path: PathBuf, parser: &TallyParser) -> FileOutcome {
    let file_start = Instant::now();
    let parsed = read_input(&path).and_then(|input| Ok(parser.parse(&input)?));
    let processing_time_ms = file_start.elapsed().as_millis() as u64;

    match parsed {
        Ok(result) => FileOutcome {
            path,
            result: Some(result),
            error: None,
            processing_time_ms,
        },
        Err(e) => FileOutcome {
            path,
            result: None,
            error: Some(e.to_string()),
            processing_time_ms,
        },
    }
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "subtotal",
        "tax",
        "total",
        "tax_breakdown",
        "consistency_score",
        "needs_verification",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(result) = &outcome.result {
            let amounts = &result.amounts;
            let show = |field: Field| {
                amounts.get(field).map(|v| v.to_string()).unwrap_or_default()
            };
            let breakdown = amounts
                .tax_breakdown
                .iter()
                .map(|b| b.display())
                .collect::<Vec<_>>()
                .join("; ");
            wtr.write_record([
                filename,
                "success",
                &show(Field::Subtotal),
                &show(Field::Tax),
                &show(Field::Total),
                &breakdown,
                &format!("{:.2}", result.consistency_score),
                &result.needs_verification.to_string(),
                &outcome.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                &outcome.processing_time_ms.to_string(),
                outcome.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
