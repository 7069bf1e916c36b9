//! Append-only CSV recorder.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use scalelog_app::ports::{Recorder, RecorderError};
use scalelog_domain::reading::DecodedReading;
use scalelog_domain::time;

use crate::error::CsvError;

/// Column layout of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `timestamp_utc,weight,unit`
    Minimal,
    /// Minimal columns plus `raw_hex,services`.
    Extended,
}

impl Layout {
    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::Minimal => "timestamp_utc,weight,unit",
            Self::Extended => "timestamp_utc,weight,unit,raw_hex,services",
        }
    }

    /// Render one row (without line terminator).
    ///
    /// A reading without weight leaves the weight and unit fields empty.
    #[must_use]
    pub fn row(self, reading: &DecodedReading, services: &[uuid::Uuid]) -> String {
        let timestamp = time::format_utc(&reading.timestamp);
        let (weight, unit) = match reading.weight {
            Some(weight) => (format!("{:.3}", weight.value), weight.unit.symbol()),
            None => (String::new(), ""),
        };

        match self {
            Self::Minimal => format!("{timestamp},{weight},{unit}"),
            Self::Extended => {
                let services = services
                    .iter()
                    .map(uuid::Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(";");
                format!("{timestamp},{weight},{unit},{},{services}", reading.raw_hex)
            }
        }
    }
}

/// [`Recorder`] writing one CSV line per reading.
#[derive(Debug)]
pub struct CsvRecorder {
    path: PathBuf,
    layout: Layout,
    writer: Option<BufWriter<File>>,
    rows: u64,
}

impl CsvRecorder {
    /// Open `path` for appending, writing the header if the file is new or
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`CsvError::Open`] if the file cannot be opened, or
    /// [`CsvError::Write`] if the header cannot be written.
    pub fn open(path: impl AsRef<Path>, layout: Layout) -> Result<Self, CsvError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| CsvError::Open {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_error)?;
        let is_empty = file.metadata().map_err(open_error)?.len() == 0;

        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{}", layout.header())?;
            writer.flush()?;
        }

        tracing::info!(
            path = %path.display(),
            ?layout,
            header_written = is_empty,
            "CSV recorder opened"
        );
        Ok(Self {
            path,
            layout,
            writer: Some(writer),
            rows: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended since the recorder was opened.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn write_row(&mut self, reading: &DecodedReading, services: &[uuid::Uuid]) -> Result<(), CsvError> {
        let line = self.layout.row(reading, services);
        let writer = self.writer.as_mut().ok_or(CsvError::Closed)?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CsvError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            tracing::info!(path = %self.path.display(), rows = self.rows, "CSV recorder closed");
        }
        Ok(())
    }
}

impl Recorder for CsvRecorder {
    fn append(
        &mut self,
        reading: &DecodedReading,
        services: &[uuid::Uuid],
    ) -> Result<(), RecorderError> {
        Ok(self.write_row(reading, services)?)
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        Ok(self.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use scalelog_domain::decoder::decode;
    use scalelog_domain::gatt::{WEIGHT_MEASUREMENT, WEIGHT_SCALE_SERVICE, sig_uuid};
    use scalelog_domain::reading::RawFrame;

    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("scalelog-{}.csv", uuid::Uuid::new_v4()))
    }

    fn reading(bytes: &[u8]) -> DecodedReading {
        let timestamp = chrono::Utc
            .with_ymd_and_hms(2024, 3, 1, 7, 30, 5)
            .unwrap();
        let frame = RawFrame::new(timestamp, WEIGHT_MEASUREMENT, bytes.to_vec());
        DecodedReading::from_frame(&frame, decode(&frame.bytes))
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    // ── Row formatting ─────────────────────────────────────────────

    #[test]
    fn should_format_minimal_row() {
        let row = Layout::Minimal.row(&reading(&[0x00, 0x00, 0x14]), &[]);
        assert_eq!(row, "2024-03-01T07:30:05.000Z,25.600,kg");
    }

    #[test]
    fn should_format_extended_row_with_services() {
        let services = [WEIGHT_SCALE_SERVICE, sig_uuid(0x180A)];
        let row = Layout::Extended.row(&reading(&[0x01, 0x64, 0x00]), &services);
        assert_eq!(
            row,
            "2024-03-01T07:30:05.000Z,1.000,lb,016400,\
             0000181d-0000-1000-8000-00805f9b34fb;0000180a-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn should_leave_weight_empty_for_unparsed_frames() {
        let row = Layout::Extended.row(&reading(&[0x00]), &[]);
        assert_eq!(row, "2024-03-01T07:30:05.000Z,,,00,");
    }

    // ── Header invariant ───────────────────────────────────────────

    #[test]
    fn should_write_header_once_across_reopens() {
        let path = temp_path();

        let mut recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        recorder.append(&reading(&[0x00, 0x00, 0x14]), &[]).unwrap();
        recorder.close().unwrap();

        let mut recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        recorder.append(&reading(&[0x00, 0x00, 0x14]), &[]).unwrap();
        recorder.close().unwrap();

        let lines = lines(&path);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp_utc,weight,unit");
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("timestamp_utc")).count(),
            1
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn should_write_header_into_existing_empty_file() {
        let path = temp_path();
        std::fs::write(&path, "").unwrap();

        let recorder = CsvRecorder::open(&path, Layout::Extended).unwrap();
        drop(recorder);

        assert_eq!(lines(&path), vec![Layout::Extended.header().to_string()]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn should_not_write_header_into_non_empty_file() {
        let path = temp_path();
        std::fs::write(&path, "existing\n").unwrap();

        let mut recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        recorder.append(&reading(&[0x00, 0x00, 0x14]), &[]).unwrap();

        let lines = lines(&path);
        assert_eq!(lines[0], "existing");
        assert_eq!(lines.len(), 2);
        std::fs::remove_file(&path).unwrap();
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[test]
    fn should_flush_every_row_before_close() {
        let path = temp_path();
        let mut recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        recorder.append(&reading(&[0x00, 0x00, 0x14]), &[]).unwrap();

        assert_eq!(lines(&path).len(), 2);
        assert_eq!(recorder.rows(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn should_expose_the_path_it_writes_to() {
        let path = temp_path();
        let recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        assert_eq!(recorder.path(), path.as_path());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn should_reject_appends_after_close() {
        let path = temp_path();
        let mut recorder = CsvRecorder::open(&path, Layout::Minimal).unwrap();
        recorder.close().unwrap();
        recorder.close().unwrap();

        let err = recorder
            .append(&reading(&[0x00, 0x00, 0x14]), &[])
            .unwrap_err();
        assert!(matches!(err, RecorderError::Closed));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn should_report_open_failure_with_path() {
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("weights.csv");
        let err = CsvRecorder::open(&path, Layout::Minimal).unwrap_err();
        assert!(matches!(err, CsvError::Open { .. }));
    }
}
