//! BLE transport configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the btleplug transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// How long to scan for the target peripheral before connecting, in
    /// seconds.
    pub locate_timeout_secs: u16,
    /// Upper bound for the GATT connect call, in seconds.
    pub connect_timeout_secs: u16,
}

impl BleConfig {
    #[must_use]
    pub fn locate_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.locate_timeout_secs))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            locate_timeout_secs: 10,
            connect_timeout_secs: 15,
        }
    }
}
