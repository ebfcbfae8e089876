//! Pupil area change classification.
//!
//! Each detected area is compared with the area of the previously detected
//! frame. The relative change `|current - previous| / previous` is bucketed
//! against a threshold `t`:
//!
//! | ratio           | label                |
//! |-----------------|----------------------|
//! | `< t`           | `No Change`          |
//! | `t ..< 2t`      | `Little Change`      |
//! | `>= 2t`         | `Significant Change` |
//!
//! The first detection of a run has no baseline and is always `No Change`.

use std::fmt;

use pupiltrack_common::config::DEFAULT_CHANGE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Qualitative magnitude of a pupil area change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeLabel {
    #[serde(rename = "No Change")]
    NoChange,
    #[serde(rename = "Little Change")]
    LittleChange,
    #[serde(rename = "Significant Change")]
    SignificantChange,
}

impl ChangeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoChange => "No Change",
            Self::LittleChange => "Little Change",
            Self::SignificantChange => "Significant Change",
        }
    }
}

impl fmt::Display for ChangeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative change of `current` against `previous`.
///
/// Returns `None` without a baseline. A zero baseline yields `0.0` when the
/// current area is also zero and `f64::INFINITY` otherwise.
pub fn change_ratio(current_area: f64, previous_area: Option<f64>) -> Option<f64> {
    let previous = previous_area?;
    let delta = (current_area - previous).abs();
    if previous == 0.0 {
        return Some(if delta == 0.0 { 0.0 } else { f64::INFINITY });
    }
    Some(delta / previous)
}

/// Classify `current_area` against an optional baseline.
pub fn classify(current_area: f64, previous_area: Option<f64>, threshold: f64) -> ChangeLabel {
    match change_ratio(current_area, previous_area) {
        None => ChangeLabel::NoChange,
        Some(ratio) if ratio < threshold => ChangeLabel::NoChange,
        Some(ratio) if ratio < 2.0 * threshold => ChangeLabel::LittleChange,
        Some(_) => ChangeLabel::SignificantChange,
    }
}

/// Stateful classifier carrying the previous detected area across frames.
///
/// Only frames with a detection should be fed to [`ChangeClassifier::observe`];
/// skipped frames leave the baseline untouched, so the next detection is
/// compared with the last one seen, however long ago.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    threshold: f64,
    previous_area: Option<f64>,
}

impl ChangeClassifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous_area: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CHANGE_THRESHOLD)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn previous_area(&self) -> Option<f64> {
        self.previous_area
    }

    /// Classify `area` and make it the new baseline.
    pub fn observe(&mut self, area: f64) -> ChangeLabel {
        let label = classify(area, self.previous_area, self.threshold);
        self.previous_area = Some(area);
        label
    }

    /// Forget the baseline, as at the start of a run.
    pub fn reset(&mut self) {
        self.previous_area = None;
    }
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_detection_is_baseline() {
        assert_eq!(classify(123.0, None, 0.05), ChangeLabel::NoChange);
        assert_eq!(classify(0.0, None, 0.5), ChangeLabel::NoChange);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(classify(104.0, Some(100.0), 0.05), ChangeLabel::NoChange);
        assert_eq!(classify(105.0, Some(100.0), 0.05), ChangeLabel::LittleChange);
        assert_eq!(classify(91.0, Some(100.0), 0.05), ChangeLabel::LittleChange);
        assert_eq!(classify(110.0, Some(100.0), 0.05), ChangeLabel::SignificantChange);
        assert_eq!(classify(50.0, Some(100.0), 0.05), ChangeLabel::SignificantChange);
    }

    #[test]
    fn test_zero_baseline_is_deterministic() {
        assert_eq!(classify(12.0, Some(0.0), 0.05), ChangeLabel::SignificantChange);
        assert_eq!(classify(0.0, Some(0.0), 0.05), ChangeLabel::NoChange);
        assert_eq!(change_ratio(12.0, Some(0.0)), Some(f64::INFINITY));
    }

    #[test]
    fn test_reference_sequence() {
        let mut classifier = ChangeClassifier::new(0.05);
        let labels: Vec<ChangeLabel> = [100.0, 100.0, 96.0, 150.0, 50.0]
            .into_iter()
            .map(|area| classifier.observe(area))
            .collect();

        assert_eq!(
            labels,
            vec![
                ChangeLabel::NoChange,
                ChangeLabel::NoChange,
                ChangeLabel::NoChange,
                ChangeLabel::SignificantChange,
                ChangeLabel::SignificantChange,
            ]
        );
        assert_eq!(classifier.previous_area(), Some(50.0));
    }

    #[test]
    fn test_reset_forgets_baseline() {
        let mut classifier = ChangeClassifier::with_defaults();
        classifier.observe(100.0);
        classifier.reset();
        assert_eq!(classifier.previous_area(), None);
        assert_eq!(classifier.observe(500.0), ChangeLabel::NoChange);
    }

    #[test]
    fn test_label_text() {
        assert_eq!(ChangeLabel::NoChange.to_string(), "No Change");
        assert_eq!(ChangeLabel::LittleChange.to_string(), "Little Change");
        assert_eq!(
            serde_json::to_string(&ChangeLabel::SignificantChange).unwrap(),
            "\"Significant Change\""
        );
    }

    proptest! {
        #[test]
        fn prop_no_baseline_is_no_change(area in 0.0f64..1e7, threshold in 0.001f64..0.999) {
            prop_assert_eq!(classify(area, None, threshold), ChangeLabel::NoChange);
        }

        #[test]
        fn prop_monotonic_in_absolute_change(
            previous in 1.0f64..1e6,
            d1 in 0.0f64..1e6,
            d2 in 0.0f64..1e6,
            grow in any::<bool>(),
            threshold in 0.001f64..0.999,
        ) {
            let (small, large) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            let sign = if grow { 1.0 } else { -1.0 };
            let near = classify(previous + sign * small, Some(previous), threshold);
            let far = classify(previous + sign * large, Some(previous), threshold);
            prop_assert!(near <= far);
        }

        #[test]
        fn prop_depends_only_on_ratio(
            previous in 1.0f64..1e4,
            ratio in 0.0f64..3.0,
            scale in 1.0f64..100.0,
            threshold in 0.001f64..0.999,
        ) {
            let a = classify(previous * (1.0 + ratio), Some(previous), threshold);
            let b = classify(previous * scale * (1.0 + ratio), Some(previous * scale), threshold);
            let exact = change_ratio(previous * (1.0 + ratio), Some(previous)).unwrap();
            // Skip cases where rounding can push the ratio across a boundary.
            let near_boundary = (exact - threshold).abs() < 1e-9 || (exact - 2.0 * threshold).abs() < 1e-9;
            prop_assume!(!near_boundary);
            prop_assert_eq!(a, b);
        }
    }
}
