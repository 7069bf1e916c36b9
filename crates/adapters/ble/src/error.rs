//! BLE adapter error types.

use scalelog_app::ports::TransportError;

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// A btleplug operation failed.
    #[error("BLE operation failed")]
    Ble(#[from] btleplug::Error),

    /// The peripheral was not seen during the locate scan.
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

    /// The GATT connect call did not complete in time.
    #[error("GATT connect timed out")]
    ConnectTimeout,
}

impl From<BleError> for TransportError {
    fn from(err: BleError) -> Self {
        match err {
            BleError::NotAvailable => Self::NotAvailable,
            BleError::DeviceNotFound { address } => Self::DeviceNotFound { address },
            BleError::CharacteristicNotFound { uuid } => Self::CharacteristicNotFound { uuid },
            BleError::ConnectTimeout | BleError::Ble(btleplug::Error::TimedOut(_)) => {
                Self::Timeout
            }
            BleError::Ble(btleplug::Error::NotConnected) => Self::NotConnected,
            other => Self::Backend(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_ble_error() {
        let err = BleError::Ble(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE operation failed");
    }

    #[test]
    fn should_convert_not_available() {
        let err: TransportError = BleError::NotAvailable.into();
        assert!(matches!(err, TransportError::NotAvailable));
    }

    #[test]
    fn should_convert_timeouts() {
        let err: TransportError = BleError::ConnectTimeout.into();
        assert!(matches!(err, TransportError::Timeout));

        let err: TransportError =
            BleError::Ble(btleplug::Error::TimedOut(Duration::from_secs(1))).into();
        assert!(matches!(err, TransportError::Timeout));
    }

    #[test]
    fn should_convert_not_connected() {
        let err: TransportError = BleError::Ble(btleplug::Error::NotConnected).into();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[test]
    fn should_keep_device_address() {
        let err: TransportError = BleError::DeviceNotFound {
            address: "80:F4:AD:DD:37:9A".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "device 80:F4:AD:DD:37:9A not found");
    }

    #[test]
    fn should_wrap_other_errors_as_backend() {
        let err: TransportError = BleError::Ble(btleplug::Error::DeviceNotFound).into();
        assert!(matches!(err, TransportError::Backend(_)));
    }
}
