//! One image through OCR, parsing and the store.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DlscanError, InputError, Result};
use crate::license::{LicenseParser, ParseOutcome};
use crate::ocr::{TextDetector, TranscriptDiagnostics};
use crate::store::RecordStore;

/// Result of processing one image.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    /// The image, as linked from the store.
    pub image: PathBuf,
    /// 1-based store row the record was written to.
    pub row: usize,
    pub outcome: ParseOutcome,
}

/// Read the image, run OCR and parse the transcript. Nothing is stored.
pub async fn extract_record<D, P>(
    detector: &D,
    parser: &P,
    diagnostics: &TranscriptDiagnostics,
    path: &Path,
) -> Result<ParseOutcome>
where
    D: TextDetector,
    P: LicenseParser,
{
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DlscanError::Input(InputError::NotFound(path.to_path_buf())),
        _ => DlscanError::Io(e),
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    let transcript = detector.detect(&bytes).await?;
    diagnostics.emit(&transcript);

    Ok(parser.parse(&transcript))
}

/// Process one image end to end and append the record to the store.
pub async fn process_image<D, P>(
    detector: &D,
    parser: &P,
    store: &RecordStore,
    diagnostics: &TranscriptDiagnostics,
    path: &Path,
) -> Result<ProcessReport>
where
    D: TextDetector,
    P: LicenseParser,
{
    let outcome = extract_record(detector, parser, diagnostics, path).await?;

    let image = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let source = image.to_string_lossy().into_owned();

    let writer = store.clone();
    let record = outcome.record.clone();
    let row = tokio::task::spawn_blocking(move || writer.append(&record, &source))
        .await
        .map_err(|e| DlscanError::Io(std::io::Error::other(e)))??;

    info!("Appended {} to row {}", image.display(), row);
    Ok(ProcessReport {
        image,
        row,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::license::RuleBasedParser;
    use crate::models::record::Field;
    use crate::store::Cell;
    use chrono::NaiveDate;

    struct FixedText(std::result::Result<String, String>);

    impl TextDetector for FixedText {
        async fn detect(&self, _image: &[u8]) -> std::result::Result<String, OcrError> {
            self.0.clone().map_err(OcrError::Service)
        }
    }

    fn parser() -> RuleBasedParser {
        RuleBasedParser::new().with_processing_date(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap())
    }

    #[tokio::test]
    async fn test_process_image_appends_row() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("license.png");
        std::fs::write(&image, b"png").unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"));

        let detector = FixedText(Ok("1 SMITH\n2 JOHN\nDOB 01/02/1985\n".to_string()));
        let report = process_image(
            &detector,
            &parser(),
            &store,
            &TranscriptDiagnostics::disabled(),
            &image,
        )
        .await
        .unwrap();

        assert_eq!(report.row, 2);
        assert_eq!(report.outcome.record.get(Field::LastName), "Smith");

        let rows = store.rows().unwrap();
        assert_eq!(rows[1][Field::DateOfBirth.column()], Cell::Text("01/02/1985".to_string()));
        match &rows[1][Field::ViewImage.column()] {
            Cell::Link { target, .. } => assert!(target.ends_with("license.png")),
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_service_error_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("license.png");
        std::fs::write(&image, b"png").unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"));

        let detector = FixedText(Err("Bad image data.".to_string()));
        let err = process_image(
            &detector,
            &parser(),
            &store,
            &TranscriptDiagnostics::disabled(),
            &image,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DlscanError::Ocr(OcrError::Service(_))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_missing_image() {
        let detector = FixedText(Ok(String::new()));
        let err = extract_record(
            &detector,
            &parser(),
            &TranscriptDiagnostics::disabled(),
            Path::new("/no/such/image.png"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DlscanError::Input(InputError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_transcript_still_stores_row() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("blank.jpg");
        std::fs::write(&image, b"jpg").unwrap();
        let store = RecordStore::new(dir.path().join("data.xlsx"));

        let report = process_image(
            &FixedText(Ok(String::new())),
            &parser(),
            &store,
            &TranscriptDiagnostics::disabled(),
            &image,
        )
        .await
        .unwrap();
        assert_eq!(report.row, 2);
        assert_eq!(store.rows().unwrap()[1][Field::Date.column()], Cell::Text("05/20/2024".to_string()));
    }
}
