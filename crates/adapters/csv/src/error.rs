//! CSV adapter error types.

use std::path::PathBuf;

use scalelog_app::ports::RecorderError;

/// Errors raised by the CSV recorder.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    /// The output file could not be opened or inspected.
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing a line failed.
    #[error("failed to write CSV line")]
    Write(#[from] std::io::Error),

    /// The recorder was already closed.
    #[error("CSV recorder is closed")]
    Closed,
}

impl From<CsvError> for RecorderError {
    fn from(err: CsvError) -> Self {
        match err {
            CsvError::Open { source, .. } | CsvError::Write(source) => Self::Io(source),
            CsvError::Closed => Self::Closed,
        }
    }
}
