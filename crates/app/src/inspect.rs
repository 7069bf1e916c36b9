//! One-shot GATT inspection for scales the selector does not recognise.
//!
//! Connects, lists every characteristic, reads the readable ones once and
//! disconnects. The report shows the raw value as hex and as text, plus what
//! the payload decoder makes of it, so an operator can tell which
//! characteristic carries the weight.

use scalelog_domain::decoder::{PayloadDecoder, WeightDecode};
use scalelog_domain::gatt::CharacteristicDescriptor;
use scalelog_domain::reading;

use crate::ports::{Transport, TransportError};

/// Inspection result for one characteristic.
#[derive(Debug)]
pub struct CharacteristicReport {
    pub descriptor: CharacteristicDescriptor,
    /// `None` when the characteristic is not readable.
    pub value: Option<Result<Vec<u8>, TransportError>>,
}

impl CharacteristicReport {
    fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Some(Ok(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Lowercase hex of the value read.
    #[must_use]
    pub fn hex(&self) -> Option<String> {
        self.bytes().map(reading::to_hex)
    }

    /// The value as text, when it is printable UTF-8 (trailing NULs dropped).
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let text = std::str::from_utf8(self.bytes()?).ok()?;
        let text = text.trim_end_matches('\0');
        let printable = !text.is_empty()
            && text
                .chars()
                .all(|c| !c.is_control() || c.is_ascii_whitespace());
        printable.then(|| text.to_string())
    }

    /// What the payload decoder makes of the value read.
    #[must_use]
    pub fn decode(&self, decoder: &PayloadDecoder) -> Option<WeightDecode> {
        self.bytes().map(|bytes| decoder.decode(bytes))
    }
}

/// Connect to `address`, read every readable characteristic once and
/// disconnect.
///
/// The link is released even when discovery fails. Individual read failures
/// are reported per characteristic and do not abort the inspection.
///
/// # Errors
///
/// Returns [`TransportError`] if connecting or discovery fails.
#[tracing::instrument(skip(transport))]
pub async fn inspect<T: Transport>(
    transport: &T,
    address: &str,
) -> Result<Vec<CharacteristicReport>, TransportError> {
    let link = transport.connect(address).await?;

    let result = inspect_inner(transport, &link).await;

    if let Err(err) = transport.disconnect(&link).await {
        tracing::warn!(%err, "failed to disconnect after inspection");
    }

    result
}

/// Inner logic, separated so the caller can always disconnect.
async fn inspect_inner<T: Transport>(
    transport: &T,
    link: &T::Link,
) -> Result<Vec<CharacteristicReport>, TransportError> {
    let descriptors = transport.discover(link).await?;
    tracing::info!(characteristics = descriptors.len(), "discovery complete");

    let mut reports = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let value = if descriptor.capabilities.can_read() {
            let value = transport.read_once(link, descriptor.characteristic).await;
            if let Err(err) = &value {
                tracing::debug!(%err, characteristic = %descriptor.characteristic, "read failed");
            }
            Some(value)
        } else {
            None
        };
        reports.push(CharacteristicReport { descriptor, value });
    }
    Ok(reports)
}
