//! Video decoding through an `ffmpeg` subprocess.
//!
//! The container is probed with `ffprobe` for its dimensions and nominal
//! frame rate, then `ffmpeg` decodes it to packed `rgb24` on stdout, one
//! `width * height * 3` byte block per frame.
//!
//! Decoding runs with `-noautorotate`: frames come out in stored
//! orientation, so they always match the probed dimensions even when the
//! stream carries rotation metadata. Area and centroid are therefore
//! reported in stored-frame coordinates.

use std::ffi::OsString;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use image::{DynamicImage, RgbImage};
use pupiltrack_common::error::{PupilError, PupilResult};
use pupiltrack_vision::source::FrameSource;

/// Stream properties reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; `None` when the container reports `0/0`.
    pub frame_rate: Option<f64>,
}

impl VideoInfo {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Probe the first video stream of `path`.
pub fn probe_video(path: &Path) -> PupilResult<VideoInfo> {
    if !path.exists() {
        return Err(PupilError::source_unavailable(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .output()
        .map_err(|e| PupilError::source_unavailable(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(PupilError::source_unavailable(format!(
            "ffprobe could not read {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let line = raw.lines().next().unwrap_or_default();
    parse_probe_line(line).ok_or_else(|| {
        PupilError::source_unavailable(format!(
            "{} has no decodable video stream (ffprobe said {:?})",
            path.display(),
            line.trim()
        ))
    })
}

/// Parse `WIDTHxHEIGHTxNUM/DEN` as printed by `ffprobe -of csv=p=0:s=x`.
fn parse_probe_line(line: &str) -> Option<VideoInfo> {
    let mut parts = line.trim().split('x');
    let width = parts.next()?.parse::<u32>().ok()?;
    let height = parts.next()?.parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    let frame_rate = parts.next().and_then(parse_rational);
    Some(VideoInfo {
        width,
        height,
        frame_rate,
    })
}

fn parse_rational(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().ok()?;
            let den = den.parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Arguments for decoding `path` to raw `rgb24` on stdout.
fn decode_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(
        ["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"]
            .into_iter()
            .map(OsString::from),
    );
    args
}

/// Frames decoded by a child `ffmpeg` process.
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Probe and start decoding `path`.
    pub fn open(path: impl Into<PathBuf>) -> PupilResult<Self> {
        let path = path.into();
        let info = probe_video(&path)?;

        let mut child = Command::new("ffmpeg")
            .args(decode_args(&path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PupilError::source_unavailable(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PupilError::source_unavailable("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PupilError::source_unavailable("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            path = %path.display(),
            pid = child.id(),
            width = info.width,
            height = info.height,
            frame_rate = ?info.frame_rate,
            "ffmpeg decoder started"
        );

        Ok(Self {
            path,
            info,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            stderr_task: Some(stderr_task),
            frames_read: 0,
        })
    }

    /// Use `fps` when the container reports no usable frame rate.
    pub fn with_fallback_frame_rate(mut self, fps: Option<f64>) -> Self {
        if self.info.frame_rate.is_none() {
            self.info.frame_rate = fps;
        }
        self
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Wait for ffmpeg after end of stream and surface a failed exit.
    fn finish_stream(&mut self) -> PupilResult<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| PupilError::decode(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self.join_stderr();

        if !status.success() {
            return Err(PupilError::decode(format!(
                "ffmpeg exited with {status} after {} frames: {}",
                self.frames_read,
                stderr_output.trim()
            )));
        }
        tracing::debug!(frames = self.frames_read, "ffmpeg reached end of stream");
        Ok(())
    }

    fn join_stderr(&mut self) -> String {
        self.stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default()
    }
}

/// Fill `buf` completely. `Ok(false)` on a clean end of stream before the
/// first byte; a stream ending mid-frame is an error.
fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("truncated frame: {filled} of {} bytes", buf.len()),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

impl FrameSource for FfmpegFrameSource {
    fn frame_rate(&self) -> Option<f64> {
        self.info.frame_rate
    }

    fn next_frame(&mut self) -> PupilResult<Option<DynamicImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.info.frame_len()];
        let got_frame = read_frame(stdout, &mut buf)
            .map_err(|e| PupilError::decode(format!("Failed reading frame {}: {e}", self.frames_read)))?;
        if !got_frame {
            self.finish_stream()?;
            return Ok(None);
        }

        let image = RgbImage::from_raw(self.info.width, self.info.height, buf)
            .ok_or_else(|| PupilError::decode("Decoded frame has unexpected size"))?;
        self.frames_read += 1;
        Ok(Some(DynamicImage::ImageRgb8(image)))
    }

    fn release(&mut self) -> PupilResult<()> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // Already exited.
                tracing::debug!(error = %e, "ffmpeg kill skipped");
            }
            child
                .wait()
                .map_err(|e| PupilError::decode(format!("Failed to wait on ffmpeg: {e}")))?;
            tracing::debug!(frames = self.frames_read, "ffmpeg decoder released");
        }
        self.join_stderr();
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "{} ({}x{} @ {})",
            self.path.display(),
            self.info.width,
            self.info.height,
            self.info
                .frame_rate
                .map(|fps| format!("{fps:.3}fps"))
                .unwrap_or_else(|| "unknown fps".to_string())
        )
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_line() {
        let info = parse_probe_line("640x480x30000/1001\n").unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert!((info.frame_rate.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(info.frame_len(), 640 * 480 * 3);

        let info = parse_probe_line("320x240x0/0").unwrap();
        assert_eq!(info.frame_rate, None);

        assert!(parse_probe_line("").is_none());
        assert!(parse_probe_line("0x480x25/1").is_none());
    }

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("24"), Some(24.0));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("abc"), None);
    }

    #[test]
    fn test_read_frame_boundaries() {
        let data = vec![7u8; 10];
        let mut reader = std::io::Cursor::new(data);
        let mut buf = [0u8; 4];
        assert!(read_frame(&mut reader, &mut buf).unwrap());
        assert!(read_frame(&mut reader, &mut buf).unwrap());
        // Two bytes left: a truncated frame.
        let err = read_frame(&mut reader, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert!(!read_frame(&mut reader, &mut buf).unwrap());
    }

    #[test]
    fn test_decode_keeps_stored_orientation() {
        let args = decode_args(Path::new("clips/eye.mov"));
        let noautorotate = args.iter().position(|a| a == "-noautorotate").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        // Input option: must precede `-i`.
        assert!(noautorotate < input);
        assert_eq!(args[input + 1], "clips/eye.mov");
        assert_eq!(args.last().unwrap(), "-");
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let path = std::env::temp_dir().join("pupiltrack_no_such_video.mp4");
        let _ = std::fs::remove_file(&path);
        let err = FfmpegFrameSource::open(&path).err().unwrap();
        assert!(err.is_source_unavailable());
    }
}
