//! # scalelog-adapter-ble
//!
//! BLE adapter — connects to a scale over GATT with btleplug.
//!
//! ## How it works
//!
//! [`BtleplugTransport`] implements both application ports that need a radio:
//!
//! - `Transport`: locate the peripheral (scanning if it is not cached yet),
//!   connect, enumerate services, forward notifications into the session's
//!   channel, read values and watch adapter events for disconnects.
//! - `Scanner`: passive advertisement scan, used by `scalelog scan` and to
//!   resolve address prefixes.
//!
//! Platform differences (services reported through `services()` on some
//! backends and only through `characteristics()` on others) are flattened
//! here so the selector always sees one descriptor list.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `scalelog-app` and `scalelog-domain`.

mod config;
mod error;
mod gatt;
mod scanner;
mod transport;

pub use config::BleConfig;
pub use error::BleError;
pub use transport::{BleLink, BtleplugTransport};
