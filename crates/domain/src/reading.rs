//! Captured frames and decoded weight readings.

use std::fmt;

use crate::decoder::WeightDecode;
use crate::time::Timestamp;

/// Bytes received from a characteristic, by notification or explicit read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Capture instant.
    pub timestamp: Timestamp,
    /// Characteristic the bytes came from.
    pub characteristic: uuid::Uuid,
    pub bytes: Vec<u8>,
}

impl RawFrame {
    #[must_use]
    pub fn new(timestamp: Timestamp, characteristic: uuid::Uuid, bytes: Vec<u8>) -> Self {
        Self {
            timestamp,
            characteristic,
            bytes,
        }
    }

    /// Capture `bytes` now.
    #[must_use]
    pub fn captured(characteristic: uuid::Uuid, bytes: Vec<u8>) -> Self {
        Self::new(crate::time::now(), characteristic, bytes)
    }
}

/// Unit of a decoded weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightUnit {
    Kilogram,
    Pound,
}

impl WeightUnit {
    /// Short symbol used in logs and records (`kg` / `lb`).
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Kilogram => "kg",
            Self::Pound => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A weight value together with its unit.
///
/// Carrying both in one type keeps "value present iff unit present".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub value: f64,
    pub unit: WeightUnit,
}

impl Weight {
    #[must_use]
    pub fn kilograms(value: f64) -> Self {
        Self {
            value,
            unit: WeightUnit::Kilogram,
        }
    }

    #[must_use]
    pub fn pounds(value: f64) -> Self {
        Self {
            value,
            unit: WeightUnit::Pound,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} {}", self.value, self.unit)
    }
}

/// Which decoding rule produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeMethod {
    /// Weight Measurement (`0x2A9D`) layout.
    Standard,
    /// Little-endian `u16` scaled by 0.005 kg.
    Uint16Kilograms,
    /// Little-endian `u16` scaled by 0.01 lb.
    Uint16Pounds,
    /// Little-endian `u32` scaled by 0.001 kg.
    Uint32Kilograms,
    /// No rule matched.
    Unparsed,
}

impl DecodeMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Uint16Kilograms => "uint16×0.005",
            Self::Uint16Pounds => "uint16×0.01",
            Self::Uint32Kilograms => "uint32×0.001",
            Self::Unparsed => "unparsed",
        }
    }
}

impl fmt::Display for DecodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped decode outcome, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReading {
    pub timestamp: Timestamp,
    pub characteristic: uuid::Uuid,
    pub weight: Option<Weight>,
    pub method: DecodeMethod,
    /// Lowercase hex of the raw payload.
    pub raw_hex: String,
    /// Byte offset the heuristic read the value at, if any.
    pub offset: Option<usize>,
}

impl DecodedReading {
    /// Attach the frame's timestamp and raw bytes to a decode outcome.
    #[must_use]
    pub fn from_frame(frame: &RawFrame, decode: WeightDecode) -> Self {
        Self {
            timestamp: frame.timestamp,
            characteristic: frame.characteristic,
            weight: decode.weight,
            method: decode.method,
            raw_hex: to_hex(&frame.bytes),
            offset: decode.offset,
        }
    }

    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.method != DecodeMethod::Unparsed
    }
}

/// Lowercase hex without separators (e.g. `"001400"`).
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
