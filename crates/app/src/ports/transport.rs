//! Transport port — GATT primitives for one BLE peripheral.
//!
//! The session never talks to a BLE stack directly. A backend adapter
//! implements this trait and hides its own API differences (how services are
//! enumerated, how notifications are delivered) behind it.

use std::future::Future;

use tokio::sync::mpsc;

use scalelog_domain::gatt::CharacteristicDescriptor;
use scalelog_domain::reading::RawFrame;

use crate::link_loss::LinkLoss;

/// Errors surfaced by a transport backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// The address did not match any reachable peripheral.
    #[error("device {address} not found")]
    DeviceNotFound {
        /// The address that was looked up.
        address: String,
    },

    /// The characteristic is not part of the discovered GATT table.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound {
        /// The characteristic that was looked up.
        uuid: uuid::Uuid,
    },

    /// The operation did not complete in time.
    #[error("transport operation timed out")]
    Timeout,

    /// The link is not (or no longer) connected.
    #[error("peripheral not connected")]
    NotConnected,

    /// Backend-specific failure.
    #[error("transport backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Connection-oriented access to a BLE peripheral.
///
/// `Link` is the backend's handle for one established connection. It is
/// cloned into background tasks (liveness monitoring), so it must be cheap to
/// clone.
pub trait Transport: Send + Sync {
    /// Handle for one established connection.
    type Link: Clone + Send + Sync + 'static;

    /// Connect to the peripheral at `address`.
    fn connect(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;

    /// Enumerate every characteristic of every service.
    fn discover(
        &self,
        link: &Self::Link,
    ) -> impl Future<Output = Result<Vec<CharacteristicDescriptor>, TransportError>> + Send;

    /// Start value delivery for `characteristic`.
    ///
    /// Each notification is sent through `frames` in arrival order. The
    /// backend must not block its own delivery path on the channel.
    fn subscribe(
        &self,
        link: &Self::Link,
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<RawFrame>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop value delivery for `characteristic`.
    fn unsubscribe(
        &self,
        link: &Self::Link,
        characteristic: uuid::Uuid,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read the current value of `characteristic` once.
    fn read_once(
        &self,
        link: &Self::Link,
        characteristic: uuid::Uuid,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Whether the link is still up.
    fn is_connected(&self, link: &Self::Link) -> impl Future<Output = bool> + Send;

    /// Arrange for `signal` to be set when the backend observes a disconnect.
    ///
    /// Returns `true` when the backend supports disconnect events. The
    /// default returns `false`, in which case the session falls back to
    /// polling [`is_connected`](Self::is_connected).
    fn watch_disconnect(
        &self,
        _link: &Self::Link,
        _signal: LinkLoss,
    ) -> impl Future<Output = bool> + Send {
        async { false }
    }

    /// Tear down the connection.
    fn disconnect(
        &self,
        link: &Self::Link,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_device_not_found() {
        let err = TransportError::DeviceNotFound {
            address: "80:F4:AD:DD:37:9A".to_string(),
        };
        assert_eq!(err.to_string(), "device 80:F4:AD:DD:37:9A not found");
    }

    #[test]
    fn should_expose_backend_source() {
        let io = std::io::Error::other("adapter powered off");
        let err = TransportError::Backend(Box::new(io));
        assert_eq!(err.to_string(), "transport backend error");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "adapter powered off");
    }
}
