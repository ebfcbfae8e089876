//! Frames read from a directory of still images.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use pupiltrack_common::error::{PupilError, PupilResult};
use pupiltrack_vision::source::FrameSource;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Decodes image files in lexicographic file-name order, one per frame.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    total: usize,
    frame_rate: Option<f64>,
}

impl ImageSequenceSource {
    /// List the images in `dir`. Fails when the directory is missing or
    /// holds no supported images.
    pub fn open(dir: impl Into<PathBuf>, frame_rate: Option<f64>) -> PupilResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(PupilError::source_unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(PupilError::source_unavailable(format!(
                "{} contains no image frames",
                dir.display()
            )));
        }

        tracing::info!(dir = %dir.display(), frames = files.len(), "Image sequence opened");
        Ok(Self {
            dir,
            total: files.len(),
            pending: files.into(),
            frame_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn next_frame(&mut self) -> PupilResult<Option<DynamicImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|e| PupilError::decode(format!("Failed to decode {}: {e}", path.display())))?;
        Ok(Some(image))
    }

    fn release(&mut self) -> PupilResult<()> {
        self.pending.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} ({} images)", self.dir.display(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_frames_in_name_order() {
        let dir = temp_dir("pupiltrack_test_sequence");
        for (name, value) in [("frame_002.png", 20u8), ("frame_001.png", 10), ("frame_010.png", 30)] {
            GrayImage::from_pixel(4, 3, Luma([value]))
                .save(dir.join(name))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(&dir, Some(30.0)).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.frame_rate(), Some(30.0));

        let mut values = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            values.push(frame.to_luma8().get_pixel(0, 0)[0]);
        }
        assert_eq!(values, vec![10, 20, 30]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_directory_is_unavailable() {
        let dir = temp_dir("pupiltrack_test_empty_sequence");
        let err = ImageSequenceSource::open(&dir, None).unwrap_err();
        assert!(err.is_source_unavailable());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_release_stops_stream() {
        let dir = temp_dir("pupiltrack_test_release_sequence");
        GrayImage::new(2, 2).save(dir.join("a.png")).unwrap();
        let mut source = ImageSequenceSource::open(&dir, None).unwrap();
        source.release().unwrap();
        assert!(source.next_frame().unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
