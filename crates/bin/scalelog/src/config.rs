//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `scalelog.toml` in the working directory (or the path given with
//! `--config`). Every field has a sensible default so the file is optional.
//! Environment variables take precedence over file values, and command-line
//! flags over both.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use scalelog_adapter_ble::BleConfig;
use scalelog_adapter_csv::CsvConfig;
use scalelog_app::selector::SelectorConfig;
use scalelog_app::session::SessionConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session timing and reconnect policy.
    pub session: SessionSettings,
    /// Advertisement scan settings.
    pub scan: ScanSettings,
    /// CSV output.
    pub recorder: CsvConfig,
    /// Characteristic selection.
    pub selector: SelectorConfig,
    /// BLE transport.
    pub ble: BleConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub duration_secs: u64,
    pub auto_reconnect: bool,
    pub retry_interval_secs: u64,
    pub poll_interval_ms: u64,
    pub liveness_interval_ms: u64,
    pub frame_buffer: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Scan length for `scan` and `--prefix` resolution, in seconds.
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// The result is not validated yet, since command-line flags may still
    /// override it; call [`Config::validate`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(secs) = var("SCALELOG_DURATION").and_then(|v| v.parse().ok()) {
            self.session.duration_secs = secs;
        }
        if let Some(enabled) = var("SCALELOG_AUTO_RECONNECT").and_then(|v| parse_bool(&v)) {
            self.session.auto_reconnect = enabled;
        }
        if let Some(secs) = var("SCALELOG_RETRY_INTERVAL").and_then(|v| v.parse().ok()) {
            self.session.retry_interval_secs = secs;
        }
        if let Some(secs) = var("SCALELOG_SCAN_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.scan.timeout_secs = secs;
        }
        if let Some(path) = var("SCALELOG_OUTPUT") {
            self.recorder.path = path.into();
        }
        if let Some(raw) = var("SCALELOG_RAW").and_then(|v| parse_bool(&v)) {
            self.recorder.raw = raw;
        }
        if let Some(filter) = var("SCALELOG_LOG") {
            self.logging.filter = filter;
        }
        if let Some(filter) = var("RUST_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Reject values that would make a session meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.session.duration_secs == 0, "session.duration_secs"),
            (self.session.retry_interval_secs == 0, "session.retry_interval_secs"),
            (self.session.poll_interval_ms == 0, "session.poll_interval_ms"),
            (self.session.liveness_interval_ms == 0, "session.liveness_interval_ms"),
            (self.session.frame_buffer == 0, "session.frame_buffer"),
            (self.scan.timeout_secs == 0, "scan.timeout_secs"),
            (self.ble.connect_timeout_secs == 0, "ble.connect_timeout_secs"),
        ];
        if let Some((_, field)) = checks.iter().find(|(is_zero, _)| *is_zero) {
            return Err(ConfigError::Validation(format!("{field} must be non-zero")));
        }
        if self.recorder.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "recorder.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.timeout_secs)
    }

    /// Session parameters for the resolved `address`.
    #[must_use]
    pub fn session_config(&self, address: String) -> SessionConfig {
        let settings = &self.session;
        SessionConfig {
            address,
            duration: Duration::from_secs(settings.duration_secs),
            auto_reconnect: settings.auto_reconnect,
            retry_interval: Duration::from_secs(settings.retry_interval_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            liveness_interval: Duration::from_millis(settings.liveness_interval_ms),
            frame_buffer: settings.frame_buffer,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration_secs: 300,
            auto_reconnect: false,
            retry_interval_secs: 5,
            poll_interval_ms: 1000,
            liveness_interval_ms: 500,
            frame_buffer: SessionConfig::DEFAULT_FRAME_BUFFER,
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "scalelog=info,scalelog_app=info,scalelog_adapter_ble=info,scalelog_adapter_csv=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
