//! Annotated frame rendering for visual inspection.
//!
//! Each analyzed frame is drawn with the selected contour in green and the
//! centroid as a filled blue dot, then written to `frame_NNNNNN.png`.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use pupiltrack_common::error::{PupilError, PupilResult};
use pupiltrack_vision::detector::Detection;
use pupiltrack_vision::pipeline::{FrameObserver, ObserverControl};

pub const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CENTER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const CENTER_RADIUS: i32 = 5;

/// Draw the detection on a copy of `frame`.
pub fn render_overlay(frame: &DynamicImage, detection: &Detection) -> RgbImage {
    let mut canvas = frame.to_rgb8();

    if let Some(contour) = &detection.contour {
        let points = contour.points();
        // Closed polyline; a single-point contour degenerates to a dot.
        for (i, start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            draw_line_segment_mut(
                &mut canvas,
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
                CONTOUR_COLOR,
            );
        }
    }

    if let Some(center) = detection.center() {
        draw_filled_circle_mut(&mut canvas, center, CENTER_RADIUS, CENTER_COLOR);
    }

    canvas
}

/// Writes one annotated PNG per analyzed frame.
///
/// With `max_frames` set, asks the pipeline to stop once that many overlays
/// have been written.
#[derive(Debug)]
pub struct OverlayWriter {
    dir: PathBuf,
    max_frames: Option<u64>,
    written: u64,
}

impl OverlayWriter {
    pub fn new(dir: impl Into<PathBuf>, max_frames: Option<u64>) -> PupilResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PupilError::visualization(format!(
                "Failed to create overlay directory {}: {e}",
                dir.display()
            ))
        })?;
        tracing::info!(dir = %dir.display(), max_frames = ?max_frames, "Writing overlays");
        Ok(Self {
            dir,
            max_frames,
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn frame_path(&self, frame_index: u64) -> PathBuf {
        self.dir.join(format!("frame_{frame_index:06}.png"))
    }
}

impl FrameObserver for OverlayWriter {
    fn observe(
        &mut self,
        frame_index: u64,
        frame: &DynamicImage,
        detection: &Detection,
    ) -> PupilResult<ObserverControl> {
        let path = self.frame_path(frame_index);
        render_overlay(frame, detection).save(&path).map_err(|e| {
            PupilError::visualization(format!("Failed to write {}: {e}", path.display()))
        })?;
        self.written += 1;

        match self.max_frames {
            Some(max) if self.written >= max => Ok(ObserverControl::Stop),
            _ => Ok(ObserverControl::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use pupiltrack_vision::detector::{DarkBlobDetector, PupilDetector};

    fn square_frame() -> DynamicImage {
        let mut img = GrayImage::from_pixel(60, 50, Luma([220]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 15).of_size(21, 21), Luma([10]));
        DynamicImage::ImageLuma8(img)
    }

    fn detect(frame: &DynamicImage) -> Detection {
        let detector = DarkBlobDetector::new(pupiltrack_common::config::DetectorConfig {
            blur_kernel_size: 1,
            ..Default::default()
        });
        detector.detect(frame)
    }

    #[test]
    fn test_render_marks_contour_and_center() {
        let frame = square_frame();
        let detection = detect(&frame);
        let (cx, cy) = detection.center().unwrap();

        let overlay = render_overlay(&frame, &detection);
        assert_eq!(overlay.dimensions(), (60, 50));
        assert_eq!(*overlay.get_pixel(cx as u32, cy as u32), CENTER_COLOR);
        // Corner of the traced square.
        assert_eq!(*overlay.get_pixel(20, 15), CONTOUR_COLOR);
        // Background untouched.
        assert_eq!(*overlay.get_pixel(2, 2), Rgb([220, 220, 220]));
    }

    #[test]
    fn test_render_without_detection_is_plain_copy() {
        let frame = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([200])));
        let overlay = render_overlay(&frame, &Detection::not_found(0.0));
        assert!(overlay.pixels().all(|p| *p == Rgb([200, 200, 200])));
    }

    #[test]
    fn test_writer_stops_at_max_frames() {
        let dir = std::env::temp_dir().join("pupiltrack_test_overlays");
        let _ = std::fs::remove_dir_all(&dir);
        let mut writer = OverlayWriter::new(&dir, Some(2)).unwrap();
        let frame = square_frame();
        let detection = detect(&frame);

        assert_eq!(
            writer.observe(0, &frame, &detection).unwrap(),
            ObserverControl::Continue
        );
        assert_eq!(
            writer.observe(3, &frame, &detection).unwrap(),
            ObserverControl::Stop
        );
        assert_eq!(writer.written(), 2);
        assert!(dir.join("frame_000000.png").exists());
        assert!(dir.join("frame_000003.png").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
