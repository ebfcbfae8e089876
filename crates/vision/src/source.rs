//! Decoded frame sources.

use std::collections::VecDeque;

use image::DynamicImage;
use pupiltrack_common::error::PupilResult;

/// A blocking, forward-only stream of decoded frames.
///
/// Container and codec handling live behind this trait; the pipeline only
/// sees rasters in decode order.
pub trait FrameSource {
    /// Nominal frame rate reported by the container, if any.
    fn frame_rate(&self) -> Option<f64>;

    /// Decode the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> PupilResult<Option<DynamicImage>>;

    /// Release decoder resources. Must be safe to call more than once.
    fn release(&mut self) -> PupilResult<()> {
        Ok(())
    }

    /// Source description for logs.
    fn describe(&self) -> String;
}

/// Frames held in memory. Used by tests and by embedders that decode
/// frames themselves.
#[derive(Debug, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<DynamicImage>,
    frame_rate: Option<f64>,
    released: bool,
}

impl MemoryFrameSource {
    pub fn new(frames: impl IntoIterator<Item = DynamicImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            frame_rate: None,
            released: false,
        }
    }

    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for MemoryFrameSource {
    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn next_frame(&mut self) -> PupilResult<Option<DynamicImage>> {
        if self.released {
            return Ok(None);
        }
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) -> PupilResult<()> {
        self.frames.clear();
        self.released = true;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory ({} frames)", self.frames.len())
    }
}
