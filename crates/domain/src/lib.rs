//! # scalelog-domain
//!
//! Pure domain model for the scalelog BLE weight recorder.
//!
//! ## Responsibilities
//! - Foundational types: timestamps, GATT characteristic descriptors
//! - Define **frames** (raw bytes captured from a characteristic) and
//!   **readings** (decoded, timestamped weights)
//! - Decode weight payloads across standard and legacy firmware dialects
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod time;

pub mod decoder;
pub mod gatt;
pub mod reading;
