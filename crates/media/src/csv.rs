//! Delimited measurement output.
//!
//! Column order and header are fixed:
//! `Timestamp,Center_X,Center_Y,Area,Change,Processing_Time`.
//! Absent optional fields are written as empty cells.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use pupiltrack_common::clock::format_timestamp;
use pupiltrack_common::error::{PupilError, PupilResult};
use pupiltrack_vision::record::{MeasurementRecord, MeasurementSink};

pub const CSV_HEADER: &str = "Timestamp,Center_X,Center_Y,Area,Change,Processing_Time";

/// Rows between forced flushes, so an aborted run leaves a usable file.
const FLUSH_EVERY: u64 = 100;

/// Writes measurement records as CSV rows.
pub struct CsvMeasurementWriter<W: Write = BufWriter<File>> {
    writer: W,
    rows_written: u64,
}

impl CsvMeasurementWriter {
    /// Create (or truncate) `path` and write the header line.
    pub fn create(path: &Path) -> PupilResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> CsvMeasurementWriter<W> {
    /// Wrap an arbitrary writer and write the header line.
    pub fn new(mut writer: W) -> PupilResult<Self> {
        writeln!(writer, "{CSV_HEADER}")
            .map_err(|e| PupilError::sink(format!("Failed to write CSV header: {e}")))?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn flush(&mut self) -> PupilResult<()> {
        self.writer
            .flush()
            .map_err(|e| PupilError::sink(format!("Failed to flush CSV: {e}")))
    }

    pub fn into_inner(mut self) -> PupilResult<W> {
        self.flush()?;
        Ok(self.writer)
    }
}

/// Render one record as a CSV row, without the line terminator.
pub fn format_row(record: &MeasurementRecord) -> String {
    let opt_int = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_default();
    let area = record.area.map(|a| format!("{a:?}")).unwrap_or_default();
    format!(
        "{},{},{},{},{},{:.6}",
        format_timestamp(record.timestamp),
        opt_int(record.center_x),
        opt_int(record.center_y),
        area,
        record.change,
        record.processing_time
    )
}

impl<W: Write> MeasurementSink for CsvMeasurementWriter<W> {
    fn emit(&mut self, record: &MeasurementRecord) -> PupilResult<()> {
        writeln!(self.writer, "{}", format_row(record))
            .map_err(|e| PupilError::sink(format!("Failed to write CSV row: {e}")))?;
        self.rows_written += 1;

        if self.rows_written % FLUSH_EVERY == 0 {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> PupilResult<()> {
        self.flush()
    }
}
