pub mod config;
pub mod parse;
pub mod process;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use dlscan_core::models::config::DlscanConfig;

/// `<config dir>/dlscan/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dlscan")
        .join("config.json")
}

/// The file `config` subcommands operate on.
pub fn config_file(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(default_config_path, Path::to_path_buf)
}

/// Load the configuration and apply environment overrides.
///
/// An explicit path must exist; the default path is optional.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<DlscanConfig> {
    let mut config = match explicit {
        Some(path) => DlscanConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config {}", path.display());
                DlscanConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            } else {
                DlscanConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}
