//! Data models for dlscan.

pub mod config;
pub mod record;

pub use config::DlscanConfig;
pub use record::{Field, LicenseRecord, HEADERS};
