//! Configuration structures for the intake pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for dlscan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DlscanConfig {
    /// Where single-shot processing looks for images.
    pub input: InputConfig,

    /// OCR service configuration.
    pub ocr: OcrConfig,

    /// Spreadsheet store configuration.
    pub store: StoreConfig,

    /// Directory watcher configuration.
    pub watch: WatchConfig,
}

/// Image discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory searched for the newest image when none is given.
    pub image_dir: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
        }
    }
}

/// OCR service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Vision `images:annotate` endpoint.
    pub endpoint: String,

    /// Service-account JSON file. Ignored if it does not exist.
    pub credentials_path: Option<PathBuf>,

    /// API key used when no service-account file is available.
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Print the raw transcript to the terminal.
    pub echo_transcript: bool,

    /// Also write the raw transcript to `raw_path`.
    pub save_raw: bool,

    /// Diagnostic transcript file.
    pub raw_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            credentials_path: Some(PathBuf::from("DLOCR.json")),
            api_key: None,
            timeout_secs: 120,
            echo_transcript: true,
            save_raw: true,
            raw_path: PathBuf::from("last_ocr.txt"),
        }
    }
}

/// Spreadsheet store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Workbook path.
    pub path: PathBuf,

    /// Sheet holding the records.
    pub sheet_name: String,

    /// How long a writer waits for the store lock, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.xlsx"),
            sheet_name: "Sheet1".to_string(),
            lock_timeout_ms: 30_000,
        }
    }
}

/// Directory watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory to watch (non-recursive).
    pub directory: PathBuf,

    /// Delay before a new file is considered fully written, in milliseconds.
    pub debounce_ms: u64,

    /// Maximum number of remembered `(path, mtime)` pairs.
    pub seen_capacity: usize,

    /// How long a remembered pair suppresses duplicates, in seconds.
    pub seen_ttl_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            debounce_ms: 500,
            seen_capacity: 1024,
            seen_ttl_secs: 3600,
        }
    }
}

impl DlscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS").filter(|v| !v.is_empty()) {
            let configured_exists = self
                .ocr
                .credentials_path
                .as_ref()
                .is_some_and(|p| p.exists());
            if !configured_exists {
                self.ocr.credentials_path = Some(PathBuf::from(path));
            }
        }
        if let Some(key) = var("DLSCAN_VISION_API_KEY").filter(|v| !v.is_empty()) {
            self.ocr.api_key = Some(key);
        }
        if let Some(flag) = var("DLSCAN_DEBUG").and_then(|v| parse_flag(&v)) {
            self.ocr.echo_transcript = flag;
        }
        if let Some(flag) = var("DLSCAN_SAVE_RAW").and_then(|v| parse_flag(&v)) {
            self.ocr.save_raw = flag;
        }
    }
}

/// Parse a boolean environment toggle.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DlscanConfig =
            serde_json::from_str(r#"{"store": {"path": "out.xlsx"}}"#).unwrap();
        assert_eq!(config.store.path, PathBuf::from("out.xlsx"));
        assert_eq!(config.store.sheet_name, "Sheet1");
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/sa.json"),
            ("DLSCAN_DEBUG", "0"),
            ("DLSCAN_SAVE_RAW", "garbage"),
        ]
        .into_iter()
        .collect();

        let mut config = DlscanConfig::default();
        config.ocr.credentials_path = Some(PathBuf::from("/definitely/missing.json"));
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(
            config.ocr.credentials_path,
            Some(PathBuf::from("/secrets/sa.json"))
        );
        assert!(!config.ocr.echo_transcript);
        assert!(config.ocr.save_raw);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
