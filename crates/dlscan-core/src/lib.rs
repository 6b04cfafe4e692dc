//! Core library for driver-license intake.
//!
//! This crate provides:
//! - Field extraction from OCR transcripts of US driver licenses
//! - A Google Cloud Vision text-detection client
//! - An append-only xlsx record store
//! - A directory watcher dispatching new images to the pipeline

pub mod error;
pub mod input;
pub mod license;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod store;
pub mod watch;

pub use error::{DlscanError, InputError, OcrError, Result, StoreError};
pub use input::find_latest_image;
pub use license::{LicenseParser, ParseOutcome, RuleBasedParser};
pub use models::{DlscanConfig, Field, LicenseRecord, HEADERS};
pub use ocr::{TextDetector, TranscriptDiagnostics, VisionClient};
pub use pipeline::{extract_record, process_image, ProcessReport};
pub use store::{RecordStore, SchemaAction};
pub use watch::{is_image_path, watch_directory, Dispatcher, PipelineRunner, SeenSet};
