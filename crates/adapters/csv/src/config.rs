//! CSV recorder configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::recorder::Layout;

/// Where and how readings are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Output file, created if missing.
    pub path: PathBuf,
    /// Capture raw payloads and service UUIDs (extended layout).
    pub raw: bool,
}

impl CsvConfig {
    #[must_use]
    pub fn layout(&self) -> Layout {
        if self.raw {
            Layout::Extended
        } else {
            Layout::Minimal
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("weights.csv"),
            raw: false,
        }
    }
}
