//! Error types for the dlscan-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the dlscan library.
#[derive(Error, Debug)]
pub enum DlscanError {
    /// No usable input image.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// OCR service error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Spreadsheet store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Directory watcher error.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors about locating or reading the source image.
#[derive(Error, Debug)]
pub enum InputError {
    /// No image was given and none was found in the directory.
    #[error("No image files found in {0}")]
    NoImageFound(PathBuf),

    /// The image path does not exist.
    #[error("image not found: {0}")]
    NotFound(PathBuf),

    /// The directory could not be scanned.
    #[error("invalid image search pattern: {0}")]
    Pattern(String),
}

/// Errors reported by, or while talking to, the OCR service.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The service answered with an error message.
    #[error("{0}")]
    Service(String),

    /// No credentials could be found or they were rejected.
    #[error("credentials: {0}")]
    Credentials(String),

    /// Transport failure (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something we could not read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors related to the spreadsheet store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open or read the workbook.
    #[error("failed to read workbook {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// Failed to write the workbook.
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Another writer holds the store lock.
    #[error("store is locked by another writer: {0}")]
    Locked(PathBuf),

    /// I/O error while persisting the workbook.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the dlscan library.
pub type Result<T> = std::result::Result<T, DlscanError>;
