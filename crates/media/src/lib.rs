//! PupilTrack Media
//!
//! I/O collaborators of the tracking pipeline:
//!
//! ```text
//! eye.mp4 ──► ffmpeg (rawvideo rgb24) ──► FfmpegFrameSource ──┐
//! frames/*.png ──────────────────────► ImageSequenceSource ──┤
//!                                                            ▼
//!                                                     PupilPipeline
//!                                                       │       │
//!                      CsvMeasurementWriter / Jsonl ◄───┘       └──► OverlayWriter (PNG)
//! ```

pub mod csv;
pub mod ffmpeg;
pub mod image_sequence;
pub mod jsonl;
pub mod overlay;

pub use csv::CsvMeasurementWriter;
pub use ffmpeg::{probe_video, FfmpegFrameSource, VideoInfo};
pub use image_sequence::ImageSequenceSource;
pub use jsonl::JsonlMeasurementWriter;
pub use overlay::OverlayWriter;
