//! Frame sampling: stride selection and optional rescaling.

use image::imageops::FilterType;
use image::DynamicImage;
use pupiltrack_common::clock::Stopwatch;
use pupiltrack_common::error::PupilResult;

use crate::source::FrameSource;
use crate::timing::{Stage, StageTimings};

/// A decoded frame selected for analysis.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Zero-based index in decode order.
    pub index: u64,
    /// Frame after rescaling.
    pub image: DynamicImage,
}

/// Selects frames `0, N, 2N, …` and rescales them before detection.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    frame_skip: u32,
    scaling_factor: f64,
    frames_decoded: u64,
}

impl FrameSampler {
    pub fn new(frame_skip: u32, scaling_factor: f64) -> Self {
        Self {
            frame_skip: frame_skip.max(1),
            scaling_factor,
            frames_decoded: 0,
        }
    }

    pub fn frame_skip(&self) -> u32 {
        self.frame_skip
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn is_selected(&self, index: u64) -> bool {
        index % self.frame_skip as u64 == 0
    }

    /// Pull frames from `source` until one is selected or the stream ends.
    pub fn next_sample(
        &mut self,
        source: &mut dyn FrameSource,
        timings: &mut StageTimings,
    ) -> PupilResult<Option<SampledFrame>> {
        loop {
            let watch = Stopwatch::start();
            let frame = source.next_frame()?;
            timings.record(Stage::Decode, watch.elapsed());

            let Some(frame) = frame else {
                return Ok(None);
            };

            let index = self.frames_decoded;
            self.frames_decoded += 1;
            if !self.is_selected(index) {
                continue;
            }

            let watch = Stopwatch::start();
            let image = self.rescale(frame);
            timings.record(Stage::Rescale, watch.elapsed());

            return Ok(Some(SampledFrame { index, image }));
        }
    }

    /// Bilinear resize by the scaling factor; identity at 1.0.
    pub fn rescale(&self, frame: DynamicImage) -> DynamicImage {
        if self.scaling_factor == 1.0 {
            return frame;
        }
        let (width, height) = scaled_dimensions(frame.width(), frame.height(), self.scaling_factor);
        frame.resize_exact(width, height, FilterType::Triangle)
    }
}

/// Target size for a uniform resize, never below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |d: u32| ((d as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFrameSource;
    use image::{GrayImage, Luma};

    fn numbered_frames(count: usize) -> Vec<DynamicImage> {
        (0..count)
            .map(|i| DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([i as u8]))))
            .collect()
    }

    fn sampled_indices(frame_count: usize, frame_skip: u32) -> Vec<u64> {
        let mut source = MemoryFrameSource::new(numbered_frames(frame_count));
        let mut sampler = FrameSampler::new(frame_skip, 1.0);
        let mut timings = StageTimings::default();
        let mut indices = Vec::new();
        while let Some(sample) = sampler.next_sample(&mut source, &mut timings).unwrap() {
            // The pixel value encodes the decode index.
            assert_eq!(sample.image.to_luma8().get_pixel(0, 0)[0] as u64, sample.index);
            indices.push(sample.index);
        }
        assert_eq!(sampler.frames_decoded(), frame_count as u64);
        indices
    }

    #[test]
    fn test_stride_selection() {
        assert_eq!(sampled_indices(10, 3), vec![0, 3, 6, 9]);
        assert_eq!(sampled_indices(9, 3), vec![0, 3, 6]);
        assert_eq!(sampled_indices(5, 1), vec![0, 1, 2, 3, 4]);
        assert_eq!(sampled_indices(4, 7), vec![0]);
        assert!(sampled_indices(0, 2).is_empty());
    }

    #[test]
    fn test_every_stride_matches_modulo_rule() {
        for frame_skip in 1..=6u32 {
            for count in 0..20usize {
                let expected: Vec<u64> = (0..count as u64)
                    .filter(|i| i % frame_skip as u64 == 0)
                    .collect();
                assert_eq!(sampled_indices(count, frame_skip), expected);
            }
        }
    }

    #[test]
    fn test_rescale() {
        let sampler = FrameSampler::new(1, 0.5);
        let frame = DynamicImage::ImageLuma8(GrayImage::new(101, 40));
        let scaled = sampler.rescale(frame);
        assert_eq!((scaled.width(), scaled.height()), (51, 20));

        let identity = FrameSampler::new(1, 1.0);
        let frame = DynamicImage::ImageLuma8(GrayImage::new(7, 3));
        let same = identity.rescale(frame);
        assert_eq!((same.width(), same.height()), (7, 3));
    }

    #[test]
    fn test_scaled_dimensions_floor_at_one() {
        assert_eq!(scaled_dimensions(3, 2, 0.01), (1, 1));
        assert_eq!(scaled_dimensions(640, 480, 1.5), (960, 720));
    }
}
