//! Recorder port — durable, append-only sink for decoded readings.

use scalelog_domain::reading::DecodedReading;

/// Errors raised while persisting readings.
///
/// Any of these is fatal to a session: a lost write is a gap in the data that
/// cannot be recovered later.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// Underlying I/O failure.
    #[error("failed to write record")]
    Io(#[from] std::io::Error),

    /// The sink was already closed.
    #[error("recorder is closed")]
    Closed,
}

/// Sink that appends one record per reading.
///
/// Calls are synchronous and expected to be quick (one short line per
/// reading). Implementations flush on every append so that a crash never
/// loses an acknowledged record.
pub trait Recorder: Send {
    /// Append `reading`. `services` lists the service UUIDs seen on the
    /// current connection, for layouts that capture them.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError`] if the record could not be written.
    fn append(
        &mut self,
        reading: &DecodedReading,
        services: &[uuid::Uuid],
    ) -> Result<(), RecorderError>;

    /// Flush and release the sink. Further appends fail with
    /// [`RecorderError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError`] if buffered records could not be flushed.
    fn close(&mut self) -> Result<(), RecorderError>;
}
