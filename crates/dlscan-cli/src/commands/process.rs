//! Process command - extract one license image into the store.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use dlscan_core::license::{ParseOutcome, RuleBasedParser};
use dlscan_core::models::record::{Field, HEADERS};
use dlscan_core::ocr::{TranscriptDiagnostics, VisionClient};
use dlscan_core::pipeline::{extract_record, process_image};
use dlscan_core::store::RecordStore;
use dlscan_core::find_latest_image;

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// License image (default: newest image in the input directory)
    image: Option<PathBuf>,

    /// Output file for the parsed record (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Parse only, do not append to the store
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let image = match args.image {
        Some(path) => path,
        None => find_latest_image(&config.input.image_dir)?,
    };
    info!("Processing file: {}", image.display());

    let detector = VisionClient::new(&config.ocr)?;
    let parser = RuleBasedParser::new();
    let diagnostics = TranscriptDiagnostics::from_config(&config.ocr);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Reading {}...", image.display()));

    let (outcome, row) = if args.dry_run {
        let outcome = extract_record(&detector, &parser, &diagnostics, &image).await;
        pb.finish_and_clear();
        (outcome?, None)
    } else {
        let store = RecordStore::from_config(&config.store);
        let report = process_image(&detector, &parser, &store, &diagnostics, &image).await;
        pb.finish_and_clear();
        let report = report?;
        (report.outcome, Some(report.row))
    };

    let output = format_outcome(&outcome, args.format)?;
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

    match row {
        Some(row) => println!(
            "{} Appended row {} to {}",
            style("✓").green(),
            row,
            config.store.path.display()
        ),
        None => println!("{} Dry run, nothing stored", style("ℹ").blue()),
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a parse result in the chosen format.
pub fn format_outcome(outcome: &ParseOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&outcome.record)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &ParseOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&HEADERS[..Field::RECORD.len()])?;
    wtr.write_record(outcome.record.values().map(|(_, v)| v))?;
    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(outcome: &ParseOutcome) -> String {
    let mut output = String::new();
    for (field, value) in outcome.record.values() {
        if !value.is_empty() {
            output.push_str(&format!("{:<16}{}\n", format!("{}:", field), value));
        }
    }
    if !outcome.gaps.is_empty() {
        let gaps: Vec<&str> = outcome.gaps.iter().map(|f| f.header()).collect();
        output.push_str(&format!("\nNot found: {}\n", gaps.join(", ")));
    }
    output
}
