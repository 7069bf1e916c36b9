//! # scalelog-adapter-csv
//!
//! CSV recorder adapter — implements the `Recorder` port on a plain file.
//!
//! ## Layouts
//!
//! | Layout | Columns |
//! |--------|---------|
//! | minimal | `timestamp_utc,weight,unit` |
//! | extended | `timestamp_utc,weight,unit,raw_hex,services` |
//!
//! The file is opened in append mode and the header is written only when the
//! file is new or empty, so repeated sessions keep extending one file. Every
//! row is flushed before `append` returns.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `scalelog-app` and `scalelog-domain`.

mod config;
mod error;
mod recorder;

pub use config::CsvConfig;
pub use error::CsvError;
pub use recorder::{CsvRecorder, Layout};
