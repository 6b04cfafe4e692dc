//! Optional echo and dump of raw transcripts.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::models::config::OcrConfig;

/// What to do with a raw transcript before it is parsed.
#[derive(Debug, Clone, Default)]
pub struct TranscriptDiagnostics {
    /// Print the transcript to stdout.
    pub echo: bool,
    /// Write the transcript to this file, replacing it.
    pub save_path: Option<PathBuf>,
}

impl TranscriptDiagnostics {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            echo: config.echo_transcript,
            save_path: config.save_raw.then(|| config.raw_path.clone()),
        }
    }

    /// No echo, no file.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit the transcript. A failed dump is logged, never fatal.
    pub fn emit(&self, transcript: &str) {
        if self.echo {
            println!("\n===== OCR RAW TEXT START =====\n");
            println!("{transcript}");
            println!("\n===== OCR RAW TEXT END =====\n");
        }
        if let Some(path) = &self.save_path {
            match fs::write(path, transcript) {
                Ok(()) => debug!("Raw transcript written to {}", path.display()),
                Err(e) => warn!("Could not write raw transcript to {}: {}", path.display(), e),
            }
        }
    }
}
