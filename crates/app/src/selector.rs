//! Characteristic selection — decide which characteristic carries weight.
//!
//! Scale firmware ranges from fully standard (Weight Measurement `0x2A9D`)
//! to vendor services with undocumented layouts. The selector walks a
//! priority ladder over the discovered characteristics and stops at the
//! first rung that matches:
//!
//! 1. the standard Weight Measurement characteristic
//! 2. a notify characteristic inside a known vendor service
//! 3. any notify characteristic
//! 4. the first readable characteristic whose current value decodes
//!
//! Rungs 1–3 are pure. Rung 4 reads from the peripheral, and the first
//! successful probe reading is handed back so that it can be recorded.

use serde::Deserialize;

use scalelog_domain::decoder::PayloadDecoder;
use scalelog_domain::gatt::{CharacteristicDescriptor, WEIGHT_MEASUREMENT};
use scalelog_domain::reading::{DecodedReading, RawFrame};

use crate::ports::Transport;

/// Selector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Service UUID prefixes (hyphenated, case-insensitive) used by scale
    /// vendors for their proprietary weight service.
    pub vendor_service_prefixes: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            vendor_service_prefixes: vec![
                "0000ffe".to_string(),
                "0000fff".to_string(),
                "0000ffb".to_string(),
            ],
        }
    }
}

/// How readings will be obtained from the chosen characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// The peripheral pushes values (notify or indicate).
    Notify,
    /// The session reads the value periodically.
    Poll,
}

/// Which rung of the ladder matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    WeightMeasurement,
    VendorService,
    AnyNotify,
    ReadProbe,
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub descriptor: CharacteristicDescriptor,
    pub rule: SelectionRule,
    pub mode: DeliveryMode,
    /// Reading obtained while probing (rule [`SelectionRule::ReadProbe`] only).
    pub probe: Option<DecodedReading>,
}

impl Selection {
    fn new(
        descriptor: &CharacteristicDescriptor,
        rule: SelectionRule,
        probe: Option<DecodedReading>,
    ) -> Self {
        let mode = if descriptor.capabilities.can_subscribe() {
            DeliveryMode::Notify
        } else {
            DeliveryMode::Poll
        };
        Self {
            descriptor: descriptor.clone(),
            rule,
            mode,
            probe,
        }
    }
}

/// The selection ladder was exhausted.
#[derive(Debug, thiserror::Error)]
#[error("no suitable characteristic among {candidates} discovered")]
pub struct NoSuitableCharacteristic {
    /// Number of characteristics that were considered.
    pub candidates: usize,
}

/// Priority-ladder characteristic selector.
#[derive(Debug, Clone)]
pub struct CharacteristicSelector {
    vendor_prefixes: Vec<String>,
}

impl Default for CharacteristicSelector {
    fn default() -> Self {
        Self::new(&SelectorConfig::default())
    }
}

impl CharacteristicSelector {
    #[must_use]
    pub fn new(config: &SelectorConfig) -> Self {
        Self {
            vendor_prefixes: config
                .vendor_service_prefixes
                .iter()
                .map(|prefix| prefix.trim().to_ascii_lowercase())
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        }
    }

    fn is_vendor_service(&self, service: uuid::Uuid) -> bool {
        let service = service.hyphenated().to_string();
        self.vendor_prefixes
            .iter()
            .any(|prefix| service.starts_with(prefix.as_str()))
    }

    /// Apply the pure rungs (1–3) of the ladder.
    #[must_use]
    pub fn select_static<'a>(
        &self,
        descriptors: &'a [CharacteristicDescriptor],
    ) -> Option<(&'a CharacteristicDescriptor, SelectionRule)> {
        if let Some(found) = descriptors
            .iter()
            .find(|d| d.characteristic == WEIGHT_MEASUREMENT)
        {
            return Some((found, SelectionRule::WeightMeasurement));
        }

        if let Some(found) = descriptors
            .iter()
            .find(|d| self.is_vendor_service(d.service) && d.capabilities.can_notify())
        {
            return Some((found, SelectionRule::VendorService));
        }

        descriptors
            .iter()
            .find(|d| d.capabilities.can_notify())
            .map(|found| (found, SelectionRule::AnyNotify))
    }

    /// Walk the full ladder, probing readable characteristics if needed.
    ///
    /// # Errors
    ///
    /// Returns [`NoSuitableCharacteristic`] when no rung matched.
    pub async fn select<T: Transport>(
        &self,
        transport: &T,
        link: &T::Link,
        descriptors: &[CharacteristicDescriptor],
        decoder: &PayloadDecoder,
    ) -> Result<Selection, NoSuitableCharacteristic> {
        if let Some((found, rule)) = self.select_static(descriptors) {
            tracing::debug!(characteristic = %found.characteristic, ?rule, "characteristic selected");
            return Ok(Selection::new(found, rule, None));
        }

        for descriptor in descriptors.iter().filter(|d| d.capabilities.can_read()) {
            let bytes = match transport.read_once(link, descriptor.characteristic).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(%err, characteristic = %descriptor.characteristic, "probe read failed");
                    continue;
                }
            };

            let frame = RawFrame::captured(descriptor.characteristic, bytes);
            let reading = DecodedReading::from_frame(&frame, decoder.decode(&frame.bytes));
            if reading.is_parsed() {
                tracing::debug!(
                    characteristic = %descriptor.characteristic,
                    method = %reading.method,
                    "characteristic selected by read probe"
                );
                return Ok(Selection::new(
                    descriptor,
                    SelectionRule::ReadProbe,
                    Some(reading),
                ));
            }

            tracing::debug!(
                characteristic = %descriptor.characteristic,
                raw = %reading.raw_hex,
                "probe value did not decode"
            );
        }

        Err(NoSuitableCharacteristic {
            candidates: descriptors.len(),
        })
    }
}
