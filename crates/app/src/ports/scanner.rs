//! Scanner port — advertisement scan for nearby peripherals.

use std::future::Future;
use std::time::Duration;

use crate::ports::TransportError;

/// One peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Address as reported by the backend (MAC or platform identifier).
    pub address: String,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

/// Passive discovery of advertising peripherals.
pub trait Scanner {
    /// Scan for `timeout` and return every peripheral seen, in discovery order.
    fn discover(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<ScanResult>, TransportError>> + Send;
}
