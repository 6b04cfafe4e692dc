//! Locating the image to process.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::error::InputError;
use crate::watch::IMAGE_EXTENSIONS;

/// The most recently created image in `dir`.
///
/// Creation time is used where the platform records it, modification time
/// otherwise.
pub fn find_latest_image(dir: &Path) -> Result<PathBuf, InputError> {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let base = Pattern::escape(&dir.to_string_lossy());

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for ext in IMAGE_EXTENSIONS {
        let pattern = format!("{base}/*.{ext}");
        let paths = glob::glob_with(&pattern, options)
            .map_err(|e| InputError::Pattern(e.to_string()))?;

        for path in paths.flatten() {
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(stamp) = meta.created().or_else(|_| meta.modified()) else {
                continue;
            };
            if latest.as_ref().is_none_or(|(best, _)| stamp > *best) {
                latest = Some((stamp, path));
            }
        }
    }

    let (_, path) = latest.ok_or_else(|| InputError::NoImageFound(dir.to_path_buf()))?;
    debug!("Latest image in {}: {}", dir.display(), path.display());
    Ok(path)
}
