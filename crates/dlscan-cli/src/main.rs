//! CLI application for driver-license OCR intake.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{config, parse, process, watch};

/// Driver-license OCR intake - extract license fields into a spreadsheet
#[derive(Parser)]
#[command(name = "dlscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one license image (the newest one if none is given)
    Process(process::ProcessArgs),

    /// Watch a directory and process every new image
    Watch(watch::WatchArgs),

    /// Parse a saved OCR transcript without calling the OCR service
    Parse(parse::ParseArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Watch(args) => watch::run(args, config_path).await,
        Commands::Parse(args) => parse::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}

/// Verbosity sets the base level, `RUST_LOG` replaces it, and the OCR
/// toggles add a directive for the OCR client.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if let Some(directive) = ocr_directive(
        std::env::var("DLSCAN_OCR_LOG").ok().as_deref(),
        std::env::var("DLSCAN_OCR_TRACE").ok().as_deref(),
    ) {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn ocr_directive(log: Option<&str>, trace: Option<&str>) -> Option<String> {
    let tracing_on = trace
        .and_then(dlscan_core::models::config::parse_flag)
        .unwrap_or(false);
    if tracing_on {
        return Some("dlscan_core::ocr=trace".to_string());
    }
    log.map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("dlscan_core::ocr={}", l.to_ascii_lowercase()))
}
