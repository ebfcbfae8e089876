//! Error types shared across PupilTrack crates.

use std::path::PathBuf;

/// Top-level error type for PupilTrack operations.
///
/// Only fatal conditions live here. A frame without a dark region, a zero
/// baseline area, and a user-requested stop are ordinary pipeline states
/// and never surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum PupilError {
    #[error("Video source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("Frame decode error: {message}")]
    Decode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Measurement sink error: {message}")]
    Sink { message: String },

    #[error("Visualization error: {message}")]
    Visualization { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PupilError.
pub type PupilResult<T> = Result<T, PupilError>;

impl PupilError {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink {
            message: msg.into(),
        }
    }

    pub fn visualization(msg: impl Into<String>) -> Self {
        Self::Visualization {
            message: msg.into(),
        }
    }

    /// Whether the error happened before any frame could be read.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PupilError::source_unavailable("cannot open eye.mp4");
        assert_eq!(
            err.to_string(),
            "Video source unavailable: cannot open eye.mp4"
        );
        assert!(err.is_source_unavailable());

        let err = PupilError::config("frame_skip must be at least 1");
        assert!(!err.is_source_unavailable());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: PupilError = io.into();
        assert!(matches!(err, PupilError::Io(_)));
    }
}
