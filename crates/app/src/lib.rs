//! # scalelog-app
//!
//! Application layer — the reading pipeline and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport` — connect, discover, subscribe, read, disconnect
//!   - `Recorder` — durable append-only sink for readings
//!   - `Scanner` — advertisement scan used to resolve address prefixes
//! - Pick the weight characteristic from a discovery result (`selector`)
//! - Drive one bounded connection session through its state machine
//!   (`session`), decoding and recording every frame
//! - One-shot characteristic inspection for unknown scales (`inspect`)
//!
//! ## Dependency rule
//! Depends on `scalelog-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod address;
pub mod inspect;
pub mod link_loss;
pub mod ports;
pub mod selector;
pub mod session;
