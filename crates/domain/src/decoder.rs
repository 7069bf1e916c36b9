//! Weight payload decoder.
//!
//! Pure functions operating on raw `&[u8]` slices — no BLE dependency needed.
//! Scales in the wild speak several dialects, so decoding is a ladder of
//! strategies tried in order; the first one that yields a weight wins and the
//! remaining ones are never invoked:
//!
//! 1. **Standard** — Weight Measurement (`0x2A9D`) layout
//! 2. **Fixed offset** — a bare little-endian integer at offset 0
//! 3. **Scanning** — a sliding window looking for a plausible human weight
//!
//! A payload no strategy understands decodes to [`DecodeMethod::Unparsed`].
//! That is a regular outcome, not an error.

use crate::reading::{DecodeMethod, Weight};

const STANDARD_MIN_LEN: usize = 3;
const IMPERIAL_FLAG: u8 = 0x01;

const KG_PER_UNIT_U16: f64 = 0.005;
const LB_PER_UNIT_U16: f64 = 0.01;
const KG_PER_UNIT_U32: f64 = 0.001;

const FIXED_MAX_KG: f64 = 500.0;
const FIXED_MAX_LB: f64 = 1000.0;

const SCAN_KG_RANGE: (f64, f64) = (2.0, 300.0);
const SCAN_LB_RANGE: (f64, f64) = (5.0, 660.0);

/// Result of decoding one payload, before it is timestamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightDecode {
    pub weight: Option<Weight>,
    pub method: DecodeMethod,
    /// Byte offset the value was read at (heuristics only).
    pub offset: Option<usize>,
}

impl WeightDecode {
    /// The outcome when no strategy matched.
    #[must_use]
    pub fn unparsed() -> Self {
        Self {
            weight: None,
            method: DecodeMethod::Unparsed,
            offset: None,
        }
    }

    fn found(weight: Weight, method: DecodeMethod, offset: Option<usize>) -> Self {
        Self {
            weight: Some(weight),
            method,
            offset,
        }
    }
}

/// One rung of the decoding ladder.
pub trait DecodeStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Try to extract a weight; `None` hands the payload to the next rung.
    fn try_decode(&self, bytes: &[u8]) -> Option<WeightDecode>;
}

/// Weight Measurement (`0x2A9D`) layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard;

/// Little-endian integer at offset 0 with loose bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOffset;

/// Sliding window over the payload with human-weight bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanning;

impl DecodeStrategy for Standard {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn try_decode(&self, bytes: &[u8]) -> Option<WeightDecode> {
        decode_standard(bytes)
    }
}

impl DecodeStrategy for FixedOffset {
    fn name(&self) -> &'static str {
        "fixed-offset"
    }

    fn try_decode(&self, bytes: &[u8]) -> Option<WeightDecode> {
        decode_fixed_offset(bytes)
    }
}

impl DecodeStrategy for Scanning {
    fn name(&self) -> &'static str {
        "scanning"
    }

    fn try_decode(&self, bytes: &[u8]) -> Option<WeightDecode> {
        decode_scanning(bytes)
    }
}

/// Ordered decoding ladder.
pub struct PayloadDecoder {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(Standard),
            Box::new(FixedOffset),
            Box::new(Scanning),
        ])
    }
}

impl std::fmt::Debug for PayloadDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

impl PayloadDecoder {
    /// Build a decoder trying `strategies` in the given order.
    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Decode a payload. Never fails: unknown payloads come back unparsed.
    #[must_use]
    pub fn decode(&self, bytes: &[u8]) -> WeightDecode {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.try_decode(bytes))
            .unwrap_or_else(WeightDecode::unparsed)
    }
}

/// Decode with the default ladder.
#[must_use]
pub fn decode(bytes: &[u8]) -> WeightDecode {
    decode_standard(bytes)
        .or_else(|| decode_fixed_offset(bytes))
        .or_else(|| decode_scanning(bytes))
        .unwrap_or_else(WeightDecode::unparsed)
}

/// Parse a Weight Measurement payload.
///
/// | Offset | Field | Type |
/// |--------|-------|------|
/// | 0 | Flags | u8, bit 0 = imperial |
/// | 1–2 | Weight | u16 LE, ×0.005 kg or ×0.01 lb |
///
/// Payloads shorter than 3 bytes yield `None`.
#[must_use]
pub fn decode_standard(bytes: &[u8]) -> Option<WeightDecode> {
    if bytes.len() < STANDARD_MIN_LEN {
        return None;
    }

    let imperial = bytes[0] & IMPERIAL_FLAG != 0;
    let raw = f64::from(u16::from_le_bytes([bytes[1], bytes[2]]));
    let weight = if imperial {
        Weight::pounds(raw * LB_PER_UNIT_U16)
    } else {
        Weight::kilograms(raw * KG_PER_UNIT_U16)
    };

    Some(WeightDecode::found(weight, DecodeMethod::Standard, None))
}

/// Read a bare little-endian integer at offset 0.
///
/// Candidates, first accepted wins:
/// `u16 × 0.005` kg in (0, 500), `u16 × 0.01` lb in (0, 1000), then
/// `u32 × 0.001` kg in (0, 500) when at least 4 bytes are present.
#[must_use]
pub fn decode_fixed_offset(bytes: &[u8]) -> Option<WeightDecode> {
    let raw16 = f64::from(read_u16(bytes, 0)?);

    let kg = raw16 * KG_PER_UNIT_U16;
    if kg > 0.0 && kg < FIXED_MAX_KG {
        return Some(WeightDecode::found(
            Weight::kilograms(kg),
            DecodeMethod::Uint16Kilograms,
            Some(0),
        ));
    }

    let lb = raw16 * LB_PER_UNIT_U16;
    if lb > 0.0 && lb < FIXED_MAX_LB {
        return Some(WeightDecode::found(
            Weight::pounds(lb),
            DecodeMethod::Uint16Pounds,
            Some(0),
        ));
    }

    let kg32 = f64::from(read_u32(bytes, 0)?) * KG_PER_UNIT_U32;
    (kg32 > 0.0 && kg32 < FIXED_MAX_KG).then(|| {
        WeightDecode::found(
            Weight::kilograms(kg32),
            DecodeMethod::Uint32Kilograms,
            Some(0),
        )
    })
}

/// Slide a window over the payload looking for a plausible weight.
///
/// Three passes, each by ascending offset: 2-byte windows as kilograms,
/// 2-byte windows as pounds, then 4-byte windows as kilograms.
#[must_use]
pub fn decode_scanning(bytes: &[u8]) -> Option<WeightDecode> {
    scan_windows(bytes, 2, KG_PER_UNIT_U16, SCAN_KG_RANGE)
        .map(|(offset, kg)| {
            WeightDecode::found(
                Weight::kilograms(kg),
                DecodeMethod::Uint16Kilograms,
                Some(offset),
            )
        })
        .or_else(|| {
            scan_windows(bytes, 2, LB_PER_UNIT_U16, SCAN_LB_RANGE).map(|(offset, lb)| {
                WeightDecode::found(Weight::pounds(lb), DecodeMethod::Uint16Pounds, Some(offset))
            })
        })
        .or_else(|| {
            scan_windows(bytes, 4, KG_PER_UNIT_U32, SCAN_KG_RANGE).map(|(offset, kg)| {
                WeightDecode::found(
                    Weight::kilograms(kg),
                    DecodeMethod::Uint32Kilograms,
                    Some(offset),
                )
            })
        })
}

/// First `(offset, scaled value)` whose `width`-byte LE window lands in `range`.
fn scan_windows(bytes: &[u8], width: usize, scale: f64, (lo, hi): (f64, f64)) -> Option<(usize, f64)> {
    bytes.windows(width).enumerate().find_map(|(offset, window)| {
        let raw = match width {
            2 => f64::from(u16::from_le_bytes([window[0], window[1]])),
            _ => f64::from(u32::from_le_bytes([
                window[0], window[1], window[2], window[3],
            ])),
        };
        let value = raw * scale;
        (lo..=hi).contains(&value).then_some((offset, value))
    })
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let window = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([window[0], window[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let window = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([
        window[0], window[1], window[2], window[3],
    ]))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::reading::WeightUnit;

    fn assert_weight(decode: &WeightDecode, value: f64, unit: WeightUnit) {
        let weight = decode.weight.expect("weight should be decoded");
        assert!(
            (weight.value - value).abs() < 1e-9,
            "expected {value}, got {}",
            weight.value
        );
        assert_eq!(weight.unit, unit);
    }

    // ── Standard ────────────────────────────────────────────────────────

    #[test]
    fn should_decode_standard_metric_payload() {
        let decode = decode_standard(&[0x00, 0x00, 0x14]).unwrap();
        assert_weight(&decode, 25.6, WeightUnit::Kilogram);
        assert_eq!(decode.method, DecodeMethod::Standard);
        assert_eq!(decode.offset, None);
    }

    #[test]
    fn should_decode_standard_imperial_payload() {
        let decode = decode_standard(&[0x01, 0x64, 0x00]).unwrap();
        assert_weight(&decode, 1.0, WeightUnit::Pound);
    }

    #[test]
    fn should_ignore_trailing_standard_fields() {
        // flags with timestamp + user id bits set; only bytes 1–2 matter.
        let decode = decode_standard(&[0x06, 0x10, 0x27, 0xE8, 0x07, 0x01, 0x01, 0x00]).unwrap();
        assert_weight(&decode, 50.0, WeightUnit::Kilogram);
    }

    #[test]
    fn should_reject_short_payloads_in_standard_decoder() {
        assert!(decode_standard(&[]).is_none());
        assert!(decode_standard(&[0x00]).is_none());
        assert!(decode_standard(&[0x00, 0x14]).is_none());
    }

    // ── Fixed offset ────────────────────────────────────────────────────

    #[test]
    fn should_decode_two_byte_payload_with_fixed_offset() {
        let decode = decode(&[0x50, 0x00]);
        assert_weight(&decode, 0.40, WeightUnit::Kilogram);
        assert_eq!(decode.method, DecodeMethod::Uint16Kilograms);
        assert_eq!(decode.offset, Some(0));
    }

    #[test]
    fn should_fall_back_to_u32_when_leading_u16_is_zero() {
        // raw32 = 0x00010000 = 65536 → 65.536 kg
        let decode = decode_fixed_offset(&[0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_weight(&decode, 65.536, WeightUnit::Kilogram);
        assert_eq!(decode.method, DecodeMethod::Uint32Kilograms);
    }

    #[test]
    fn should_reject_zero_and_oversized_fixed_offset_values() {
        assert!(decode_fixed_offset(&[0x00, 0x00]).is_none());
        // raw32 = 0x00200000 → 2097.152 kg, out of range
        assert!(decode_fixed_offset(&[0x00, 0x00, 0x20, 0x00]).is_none());
        assert!(decode_fixed_offset(&[0x50]).is_none());
    }

    // ── Scanning ────────────────────────────────────────────────────────

    #[test]
    fn should_scan_past_implausible_leading_window() {
        let decode = decode_scanning(&[0xFF, 0xFF, 0x10, 0x27]).unwrap();
        assert_weight(&decode, 21.755, WeightUnit::Kilogram);
        assert_eq!(decode.method, DecodeMethod::Uint16Kilograms);
        assert_eq!(decode.offset, Some(1));
    }

    #[test]
    fn should_prefer_any_kilogram_window_over_an_earlier_pound_window() {
        // Offset 0 is 655.35 lb (plausible) but offset 1 is 21.755 kg, and
        // every kilogram window is tried before any pound window.
        let decode = decode_scanning(&[0xFF, 0xFF, 0x10]).unwrap();
        assert_eq!(decode.method, DecodeMethod::Uint16Kilograms);
        assert_eq!(decode.offset, Some(1));
    }

    #[test]
    fn should_accept_pounds_window_when_kilograms_out_of_range() {
        // raw16 = 0xFDE8 = 65000 → 325 kg (rejected), 650 lb (accepted)
        let decode = decode_scanning(&[0xE8, 0xFD]).unwrap();
        assert_weight(&decode, 650.0, WeightUnit::Pound);
        assert_eq!(decode.method, DecodeMethod::Uint16Pounds);
        assert_eq!(decode.offset, Some(0));
    }

    #[test]
    fn should_try_four_byte_windows_only_after_all_two_byte_windows() {
        // No 2-byte window is plausible (0, 0, 0x0100 → 1.28 kg / 2.56 lb,
        // 0x0001 tiny); the u32 at offset 0 is 0x00010000 → 65.536 kg.
        let decode = decode_scanning(&[0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(decode.method, DecodeMethod::Uint32Kilograms);
        assert_eq!(decode.offset, Some(0));
        assert_weight(&decode, 65.536, WeightUnit::Kilogram);
    }

    #[test]
    fn should_return_none_when_no_window_is_plausible() {
        assert!(decode_scanning(&[0x00, 0x00, 0x00, 0x00, 0x00]).is_none());
        assert!(decode_scanning(&[0x01]).is_none());
        assert!(decode_scanning(&[]).is_none());
    }

    // ── Composite ───────────────────────────────────────────────────────

    #[test]
    fn should_return_unparsed_for_undecodable_payload() {
        let outcome = decode(&[0x00, 0x00]);
        assert_eq!(outcome, WeightDecode::unparsed());
        assert!(outcome.weight.is_none());
        assert_eq!(decode(&[]).method, DecodeMethod::Unparsed);
        assert_eq!(decode(&[0x7F]).method, DecodeMethod::Unparsed);
    }

    #[test]
    fn should_agree_between_free_function_and_default_ladder() {
        let decoder = PayloadDecoder::default();
        let payloads: [&[u8]; 5] = [
            &[0x00, 0x00, 0x14],
            &[0x50, 0x00],
            &[0x00, 0x00],
            &[0x01, 0x64, 0x00],
            &[],
        ];
        for payload in payloads {
            assert_eq!(decoder.decode(payload), decode(payload));
        }
    }

    struct Counting<S> {
        inner: S,
        calls: Arc<AtomicUsize>,
    }

    impl<S: DecodeStrategy> DecodeStrategy for Counting<S> {
        fn name(&self) -> &'static str {
            self.inner.name()
        }

        fn try_decode(&self, bytes: &[u8]) -> Option<WeightDecode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.try_decode(bytes)
        }
    }

    fn counting_decoder() -> (PayloadDecoder, [Arc<AtomicUsize>; 3]) {
        let counters = [
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        ];
        let decoder = PayloadDecoder::with_strategies(vec![
            Box::new(Counting {
                inner: Standard,
                calls: Arc::clone(&counters[0]),
            }),
            Box::new(Counting {
                inner: FixedOffset,
                calls: Arc::clone(&counters[1]),
            }),
            Box::new(Counting {
                inner: Scanning,
                calls: Arc::clone(&counters[2]),
            }),
        ]);
        (decoder, counters)
    }

    #[test]
    fn should_not_invoke_heuristics_when_standard_succeeds() {
        let (decoder, [standard, fixed, scanning]) = counting_decoder();

        let decode = decoder.decode(&[0x00, 0x00, 0x14]);

        assert_eq!(decode.method, DecodeMethod::Standard);
        assert_eq!(standard.load(Ordering::SeqCst), 1);
        assert_eq!(fixed.load(Ordering::SeqCst), 0);
        assert_eq!(scanning.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_not_invoke_scanning_when_fixed_offset_succeeds() {
        let (decoder, [standard, fixed, scanning]) = counting_decoder();

        let decode = decoder.decode(&[0x50, 0x00]);

        assert_eq!(decode.method, DecodeMethod::Uint16Kilograms);
        assert_eq!(standard.load(Ordering::SeqCst), 1);
        assert_eq!(fixed.load(Ordering::SeqCst), 1);
        assert_eq!(scanning.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_invoke_every_strategy_for_unparsed_payload() {
        let (decoder, counters) = counting_decoder();

        let decode = decoder.decode(&[0x00, 0x00]);

        assert_eq!(decode.method, DecodeMethod::Unparsed);
        for counter in counters {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn should_list_strategy_names_in_debug_output() {
        let decoder = PayloadDecoder::default();
        assert_eq!(
            format!("{decoder:?}"),
            r#"["standard", "fixed-offset", "scanning"]"#
        );
    }
}
