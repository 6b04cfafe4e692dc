//! Parse command - run the field parser on a saved transcript.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use dlscan_core::license::{LicenseParser, RuleBasedParser};

use super::load_config;
use super::process::{format_outcome, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Transcript file, or `-` for stdin (default: the saved raw transcript)
    input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn run(args: ParseArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let input = match args.input {
        Some(path) => path,
        None => load_config(config_path)?.ocr.raw_path,
    };

    let transcript = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&input)
            .with_context(|| format!("Failed to read transcript {}", input.display()))?
    };

    let outcome = RuleBasedParser::new().parse(&transcript);
    println!("{}", format_outcome(&outcome, args.format)?);

    Ok(())
}
