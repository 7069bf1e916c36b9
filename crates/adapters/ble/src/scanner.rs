//! Advertisement scan used for `scan` listings and prefix resolution.

use std::time::Duration;

use btleplug::api::{Central as _, CentralEvent, Peripheral as _, ScanFilter};
use tokio_stream::StreamExt as _;

use scalelog_app::ports::{ScanResult, Scanner, TransportError};

use crate::error::BleError;
use crate::transport::BtleplugTransport;

impl BtleplugTransport {
    /// Scan for `duration` and list every peripheral seen, in discovery
    /// order.
    async fn scan(&self, duration: Duration) -> Result<Vec<ScanResult>, BleError> {
        let central = self.central().await?;
        let mut events = central.events().await?;

        central.start_scan(ScanFilter::default()).await?;
        tracing::info!(duration_secs = duration.as_secs(), "BLE scan started");

        let mut order = Vec::new();
        let deadline = tokio::time::Instant::now() + duration;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(Some(CentralEvent::DeviceDiscovered(id))) => {
                    if !order.contains(&id) {
                        order.push(id);
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }

        central.stop_scan().await?;

        let mut results = Vec::with_capacity(order.len());
        for id in &order {
            let Ok(peripheral) = central.peripheral(id).await else {
                continue;
            };
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            tracing::trace!(address = %props.address, name = ?props.local_name, "BLE device detected");
            results.push(ScanResult {
                name: props.local_name,
                address: props.address.to_string(),
                rssi: props.rssi,
            });
        }

        tracing::info!(count = results.len(), "BLE scan complete");
        Ok(results)
    }
}

impl Scanner for BtleplugTransport {
    async fn discover(&self, timeout: Duration) -> Result<Vec<ScanResult>, TransportError> {
        Ok(self.scan(timeout).await?)
    }
}
