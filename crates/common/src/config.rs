//! Tracker configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PupilError, PupilResult};

/// Default relative area change below which a frame counts as "No Change".
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.05;

/// Default square blur kernel edge length, in pixels.
pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 15;

/// Default intensity cutoff; darker pixels become pupil candidates.
pub const DEFAULT_INTENSITY_THRESHOLD: u8 = 80;

/// Global tracker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sampling, scaling, and classification settings.
    pub pipeline: PipelineConfig,

    /// Pupil detector tuning.
    pub detector: DetectorConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Per-run pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Process every Nth decoded frame.
    pub frame_skip: u32,

    /// Desired analysis rate. When set and the source reports its frame
    /// rate, it overrides `frame_skip`.
    pub target_fps: Option<f64>,

    /// Uniform resize factor applied before detection (1.0 = no resize).
    pub scaling_factor: f64,

    /// Relative area change separating "No Change" from "Little Change".
    /// Twice this value separates "Little Change" from "Significant Change".
    pub change_threshold: f64,

    /// Whether the visualization observer is attached.
    pub visualization_enabled: bool,
}

/// Tunable constants of the dark-blob pupil detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Square Gaussian kernel size. Must be odd; 1 disables blurring.
    pub blur_kernel_size: u32,

    /// Pixels strictly darker than this become foreground.
    pub intensity_threshold: u8,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pupiltrack=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_skip: 1,
            target_fps: None,
            scaling_factor: 1.0,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            visualization_enabled: false,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: DEFAULT_BLUR_KERNEL_SIZE,
            intensity_threshold: DEFAULT_INTENSITY_THRESHOLD,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Check that every field is within its documented range.
    pub fn validate(&self) -> PupilResult<()> {
        if self.frame_skip == 0 {
            return Err(PupilError::config("frame_skip must be at least 1"));
        }
        if !(self.scaling_factor.is_finite() && self.scaling_factor > 0.0) {
            return Err(PupilError::config(format!(
                "scaling_factor must be a positive number, got {}",
                self.scaling_factor
            )));
        }
        if !(self.change_threshold > 0.0 && self.change_threshold < 1.0) {
            return Err(PupilError::config(format!(
                "change_threshold must lie in (0, 1), got {}",
                self.change_threshold
            )));
        }
        if let Some(fps) = self.target_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(PupilError::config(format!(
                    "target_fps must be a positive number, got {fps}"
                )));
            }
        }
        Ok(())
    }

    /// Sampling stride for a source with the given nominal frame rate.
    ///
    /// `target_fps` wins when both it and the source rate are known;
    /// the stride never drops below 1.
    pub fn effective_frame_skip(&self, source_fps: Option<f64>) -> u32 {
        match (self.target_fps, source_fps) {
            (Some(target), Some(source)) if target > 0.0 && source.is_finite() && source > 0.0 => {
                ((source / target).floor() as u32).max(1)
            }
            _ => self.frame_skip.max(1),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> PupilResult<()> {
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(PupilError::config(format!(
                "blur_kernel_size must be a positive odd number, got {}",
                self.blur_kernel_size
            )));
        }
        Ok(())
    }
}

impl TrackerConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit JSON file.
    pub fn load_from(path: &Path) -> PupilResult<Self> {
        if !path.exists() {
            return Err(PupilError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> PupilResult<()> {
        self.pipeline.validate()?;
        self.detector.validate()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("pupiltrack").join("config.json")
}
