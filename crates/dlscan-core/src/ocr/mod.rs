//! Text extraction through an external OCR service.

pub mod auth;
mod diagnostics;
mod vision;

pub use auth::{Credentials, ServiceAccountKey};
pub use diagnostics::TranscriptDiagnostics;
pub use vision::VisionClient;

use std::future::Future;

use crate::error::OcrError;

/// An OCR capability: image bytes in, one block of recognized text out.
///
/// An image without any text yields an empty transcript, not an error.
pub trait TextDetector {
    /// Recognize all text in the image.
    fn detect(&self, image: &[u8]) -> impl Future<Output = Result<String, OcrError>> + Send;
}
