//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the reading pipeline and the outside
//! world. They are defined here (in `app`) so that both the session and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod recorder;
pub mod scanner;
pub mod transport;

pub use recorder::{Recorder, RecorderError};
pub use scanner::{ScanResult, Scanner};
pub use transport::{Transport, TransportError};
