//! Pupil detection: the "largest dark blob" heuristic.
//!
//! # Algorithm
//!
//! 1. **Grayscale:** collapse the frame to 8-bit intensity.
//! 2. **Blur:** Gaussian blur with a square kernel (default 15x15).
//! 3. **Inverse threshold:** pixels darker than the cutoff (default 80) become foreground.
//! 4. **Contours:** trace the outer border of every top-level foreground component.
//! 5. **Select:** keep the contour enclosing the largest area; the first one
//!    found in raster order wins ties.
//! 6. **Measure:** centroid from polygon moments, area from the shoelace formula.
//!
//! `processing_time` covers steps 1–4 only.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use pupiltrack_common::clock::Stopwatch;
use pupiltrack_common::config::DetectorConfig;

use crate::contour::PupilContour;

/// Result of running a detector on one frame.
///
/// All optional fields are `None` when no foreground region was found.
/// The centre is also `None` when the selected contour encloses no area.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub center_x: Option<i32>,
    pub center_y: Option<i32>,
    pub area: Option<f64>,
    /// Seconds spent on grayscale, blur, threshold, and contour extraction.
    pub processing_time: f64,
    /// Boundary of the selected region, kept for visualization.
    pub contour: Option<PupilContour>,
}

impl Detection {
    pub fn not_found(processing_time: f64) -> Self {
        Self {
            center_x: None,
            center_y: None,
            area: None,
            processing_time,
            contour: None,
        }
    }

    /// Whether a qualifying region was found.
    pub fn is_found(&self) -> bool {
        self.area.is_some()
    }

    pub fn center(&self) -> Option<(i32, i32)> {
        Some((self.center_x?, self.center_y?))
    }

    /// Equality on everything except the timing field.
    pub fn same_measurement(&self, other: &Detection) -> bool {
        self.center_x == other.center_x
            && self.center_y == other.center_y
            && self.area == other.area
            && self.contour == other.contour
    }
}

/// A stateless per-frame pupil detector.
///
/// Implementations must be pure functions of the frame: calling `detect`
/// twice on the same input yields the same measurement.
pub trait PupilDetector: Send + Sync {
    fn detect(&self, frame: &DynamicImage) -> Detection;

    /// Detector name for logs.
    fn name(&self) -> &str;
}

/// Reference detector: blur, inverse threshold, largest outer contour.
#[derive(Debug, Clone)]
pub struct DarkBlobDetector {
    config: DetectorConfig,
}

impl DarkBlobDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(DetectorConfig::default())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Gaussian sigma used for a square kernel of the given size.
    ///
    /// Matches the convention of deriving sigma from the aperture when no
    /// explicit sigma is supplied: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
    pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
        0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Steps 1–3: grayscale, blur, inverse threshold. Foreground is 255.
    pub fn binary_mask(&self, frame: &DynamicImage) -> GrayImage {
        let gray = frame.to_luma8();
        let blurred = self.blur(gray);
        self.threshold(&blurred)
    }

    fn blur(&self, gray: GrayImage) -> GrayImage {
        if self.config.blur_kernel_size <= 1 {
            return gray;
        }
        let sigma = Self::sigma_for_kernel(self.config.blur_kernel_size);
        imageproc::filter::gaussian_blur_f32(&gray, sigma)
    }

    fn threshold(&self, blurred: &GrayImage) -> GrayImage {
        let cutoff = self.config.intensity_threshold;
        GrayImage::from_fn(blurred.width(), blurred.height(), |x, y| {
            if blurred.get_pixel(x, y)[0] < cutoff {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

impl Default for DarkBlobDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PupilDetector for DarkBlobDetector {
    fn detect(&self, frame: &DynamicImage) -> Detection {
        let watch = Stopwatch::start();
        let mask = self.binary_mask(frame);
        let contours = outer_contours(&mask);
        let processing_time = watch.elapsed_secs();

        let Some(pupil) = largest_contour(contours) else {
            return Detection::not_found(processing_time);
        };

        let area = pupil.area();
        let centroid = pupil.moments().centroid();

        Detection {
            center_x: centroid.map(|(x, _)| x),
            center_y: centroid.map(|(_, y)| y),
            area: Some(area),
            processing_time,
            contour: Some(pupil),
        }
    }

    fn name(&self) -> &str {
        "dark-blob"
    }
}

/// Outer borders of all top-level foreground components, in raster order.
///
/// Hole borders and components nested inside holes are dropped. Pixels
/// outside the frame count as background, so regions touching the frame
/// edge are traced like any other.
pub fn outer_contours(mask: &GrayImage) -> Vec<PupilContour> {
    // The tracer only starts an outer border after a background pixel on
    // the same row; pad by one pixel and shift the points back.
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            PupilContour::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(p.x - 1, p.y - 1))
                    .collect(),
            )
        })
        .collect()
}

/// The contour with the largest enclosed area; earliest wins ties.
pub fn largest_contour(contours: Vec<PupilContour>) -> Option<PupilContour> {
    let mut best: Option<(f64, PupilContour)> = None;
    for contour in contours {
        let area = contour.area();
        match &best {
            Some((best_area, _)) if area <= *best_area => {}
            _ => best = Some((area, contour)),
        }
    }
    best.map(|(_, contour)| contour)
}
