//! Conversions between btleplug's GATT model and the domain descriptors.
//!
//! Some platform backends populate `services()` after discovery, others only
//! `characteristics()`. Both paths end up as a flat, ordered list of
//! [`CharacteristicDescriptor`]s.

use std::collections::BTreeSet;

use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, Service};
use btleplug::platform::Peripheral;

use scalelog_app::address;
use scalelog_domain::gatt::{Capabilities, CharacteristicDescriptor};

use crate::error::BleError;

/// Map btleplug property flags onto the capabilities the selector cares about.
pub(crate) fn capabilities_from_flags(flags: CharPropFlags) -> Capabilities {
    let mut capabilities = Capabilities::NONE;
    if flags.contains(CharPropFlags::READ) {
        capabilities = capabilities | Capabilities::READ;
    }
    if flags.intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        capabilities = capabilities | Capabilities::WRITE;
    }
    if flags.contains(CharPropFlags::NOTIFY) {
        capabilities = capabilities | Capabilities::NOTIFY;
    }
    if flags.contains(CharPropFlags::INDICATE) {
        capabilities = capabilities | Capabilities::INDICATE;
    }
    capabilities
}

pub(crate) fn descriptor_for(characteristic: &Characteristic) -> CharacteristicDescriptor {
    CharacteristicDescriptor::new(
        characteristic.service_uuid,
        characteristic.uuid,
        capabilities_from_flags(characteristic.properties),
    )
}

/// Flatten the service tree; falls back to the flat characteristic set when
/// the backend reported no services.
pub(crate) fn descriptors(
    services: &BTreeSet<Service>,
    characteristics: &BTreeSet<Characteristic>,
) -> Vec<CharacteristicDescriptor> {
    if services.is_empty() {
        return characteristics.iter().map(descriptor_for).collect();
    }
    services
        .iter()
        .flat_map(|service| service.characteristics.iter())
        .map(descriptor_for)
        .collect()
}

/// Find a GATT characteristic by UUID on a peripheral that has already
/// discovered its services.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] if no characteristic with
/// the given UUID is present.
pub(crate) fn find_characteristic(
    peripheral: &Peripheral,
    uuid: uuid::Uuid,
) -> Result<Characteristic, BleError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or(BleError::CharacteristicNotFound { uuid })
}

/// Whether a peripheral identified by its MAC (`reported`) or platform id
/// (`id`) is the one the operator asked for.
///
/// Platforms that hide MAC addresses (macOS) only expose the id.
pub(crate) fn matches_address(reported: &str, id: &str, wanted: &str) -> bool {
    let wanted = address::normalize(wanted);
    address::normalize(reported) == wanted || address::normalize(id) == wanted
}
