//! Emitted measurement records and the sink they flow into.

use chrono::NaiveTime;
use pupiltrack_common::error::PupilResult;
use serde::{Deserialize, Serialize};

use crate::classifier::ChangeLabel;
use crate::detector::Detection;

/// One measurement, emitted for every sampled frame with a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Local wall-clock time at emission, whole seconds.
    pub timestamp: NaiveTime,
    pub center_x: Option<i32>,
    pub center_y: Option<i32>,
    /// Enclosed area in raster pixels of the analyzed (possibly rescaled) frame.
    pub area: Option<f64>,
    pub change: ChangeLabel,
    /// Seconds spent by the detector's preprocessing and contour extraction.
    pub processing_time: f64,
    /// Decode index of the frame the record came from.
    pub frame_index: u64,
}

impl MeasurementRecord {
    pub fn from_detection(
        timestamp: NaiveTime,
        frame_index: u64,
        detection: &Detection,
        change: ChangeLabel,
    ) -> Self {
        Self {
            timestamp,
            center_x: detection.center_x,
            center_y: detection.center_y,
            area: detection.area,
            change,
            processing_time: detection.processing_time,
            frame_index,
        }
    }
}

/// Destination of the ordered measurement stream.
pub trait MeasurementSink {
    fn emit(&mut self, record: &MeasurementRecord) -> PupilResult<()>;

    /// Flush anything buffered. Called once at the end of a run.
    fn finish(&mut self) -> PupilResult<()> {
        Ok(())
    }
}

impl MeasurementSink for Vec<MeasurementRecord> {
    fn emit(&mut self, record: &MeasurementRecord) -> PupilResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_copies_detection_fields() {
        let detection = Detection {
            center_x: Some(12),
            center_y: Some(34),
            area: Some(56.5),
            processing_time: 0.25,
            contour: None,
        };
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let record =
            MeasurementRecord::from_detection(time, 8, &detection, ChangeLabel::LittleChange);

        assert_eq!(record.center_x, Some(12));
        assert_eq!(record.center_y, Some(34));
        assert_eq!(record.area, Some(56.5));
        assert_eq!(record.processing_time, 0.25);
        assert_eq!(record.frame_index, 8);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "09:30:00");
        assert_eq!(json["change"], "Little Change");
    }
}
