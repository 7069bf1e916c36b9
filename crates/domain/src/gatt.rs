//! GATT characteristic descriptors and well-known UUIDs.

use std::fmt;

/// Standard Weight Measurement characteristic (`0x2A9D`).
pub const WEIGHT_MEASUREMENT: uuid::Uuid =
    uuid::Uuid::from_u128(0x0000_2a9d_0000_1000_8000_0080_5f9b_34fb);

/// Standard Weight Scale service (`0x181D`).
pub const WEIGHT_SCALE_SERVICE: uuid::Uuid =
    uuid::Uuid::from_u128(0x0000_181d_0000_1000_8000_0080_5f9b_34fb);

/// Set of operations a characteristic supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No capability.
    pub const NONE: Self = Self(0);
    /// The value can be read on demand.
    pub const READ: Self = Self(0b0001);
    /// The value can be written.
    pub const WRITE: Self = Self(0b0010);
    /// The peripheral pushes value changes without acknowledgement.
    pub const NOTIFY: Self = Self(0b0100);
    /// The peripheral pushes value changes with acknowledgement.
    pub const INDICATE: Self = Self(0b1000);

    /// Return `true` if every capability in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two capability sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    #[must_use]
    pub const fn can_notify(self) -> bool {
        self.contains(Self::NOTIFY)
    }

    /// Whether values are pushed by the peripheral (notify or indicate).
    #[must_use]
    pub const fn can_subscribe(self) -> bool {
        self.contains(Self::NOTIFY) || self.contains(Self::INDICATE)
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::READ, "read"),
            (Self::WRITE, "write"),
            (Self::NOTIFY, "notify"),
            (Self::INDICATE, "indicate"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A characteristic reported by service discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    /// UUID of the owning service.
    pub service: uuid::Uuid,
    /// UUID of the characteristic itself.
    pub characteristic: uuid::Uuid,
    pub capabilities: Capabilities,
}

impl CharacteristicDescriptor {
    #[must_use]
    pub fn new(service: uuid::Uuid, characteristic: uuid::Uuid, capabilities: Capabilities) -> Self {
        Self {
            service,
            characteristic,
            capabilities,
        }
    }
}

/// Distinct service UUIDs in first-seen order.
#[must_use]
pub fn service_ids(descriptors: &[CharacteristicDescriptor]) -> Vec<uuid::Uuid> {
    let mut services = Vec::new();
    for descriptor in descriptors {
        if !services.contains(&descriptor.service) {
            services.push(descriptor.service);
        }
    }
    services
}

/// Build a full UUID from a 16-bit Bluetooth SIG assigned number.
#[must_use]
pub fn sig_uuid(short: u16) -> uuid::Uuid {
    uuid::Uuid::from_u128(0x0000_0000_0000_1000_8000_0080_5f9b_34fb | (u128::from(short) << 96))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_weight_measurement_from_short_uuid() {
        assert_eq!(sig_uuid(0x2A9D), WEIGHT_MEASUREMENT);
        assert_eq!(sig_uuid(0x181D), WEIGHT_SCALE_SERVICE);
        assert_eq!(
            WEIGHT_MEASUREMENT.to_string(),
            "00002a9d-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn should_combine_capabilities() {
        let caps = Capabilities::READ | Capabilities::NOTIFY;
        assert!(caps.can_read());
        assert!(caps.can_notify());
        assert!(caps.can_subscribe());
        assert!(!caps.contains(Capabilities::WRITE));
    }

    #[test]
    fn should_treat_indicate_as_subscribable() {
        let caps = Capabilities::INDICATE;
        assert!(caps.can_subscribe());
        assert!(!caps.can_notify());
        assert!(!caps.can_read());
    }

    #[test]
    fn should_display_capabilities_in_fixed_order() {
        let caps = Capabilities::INDICATE | Capabilities::READ | Capabilities::WRITE;
        assert_eq!(caps.to_string(), "read,write,indicate");
        assert_eq!(Capabilities::NONE.to_string(), "");
    }

    #[test]
    fn should_list_distinct_services_in_first_seen_order() {
        let a = sig_uuid(0x181D);
        let b = sig_uuid(0xFFE0);
        let descriptors = vec![
            CharacteristicDescriptor::new(b, sig_uuid(0xFFE1), Capabilities::NOTIFY),
            CharacteristicDescriptor::new(a, WEIGHT_MEASUREMENT, Capabilities::INDICATE),
            CharacteristicDescriptor::new(b, sig_uuid(0xFFE2), Capabilities::READ),
        ];
        assert_eq!(service_ids(&descriptors), vec![b, a]);
    }
}
