//! Line-delimited JSON measurement output, one record object per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pupiltrack_common::error::{PupilError, PupilResult};
use pupiltrack_vision::record::{MeasurementRecord, MeasurementSink};

pub struct JsonlMeasurementWriter<W: Write = BufWriter<File>> {
    writer: W,
    records_written: u64,
}

impl JsonlMeasurementWriter {
    pub fn create(path: &Path) -> PupilResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonlMeasurementWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn into_inner(mut self) -> PupilResult<W> {
        self.finish()?;
        Ok(self.writer)
    }
}

impl<W: Write> MeasurementSink for JsonlMeasurementWriter<W> {
    fn emit(&mut self, record: &MeasurementRecord) -> PupilResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| PupilError::sink(format!("Failed to write JSONL record: {e}")))?;
        self.records_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> PupilResult<()> {
        self.writer
            .flush()
            .map_err(|e| PupilError::sink(format!("Failed to flush JSONL: {e}")))
    }
}
