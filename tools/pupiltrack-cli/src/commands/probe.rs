//! Show video stream information.

use std::path::PathBuf;

use pupiltrack_media::probe_video;

pub fn run(input: PathBuf) -> anyhow::Result<()> {
    let info = probe_video(&input).map_err(|e| anyhow::anyhow!("Failed to probe video: {e}"))?;

    println!("Video: {}", input.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    match info.frame_rate {
        Some(fps) => println!("  Frame rate: {fps:.3} fps"),
        None => println!("  Frame rate: unknown (use --frame-skip or --source-fps)"),
    }
    println!("  Bytes per decoded frame: {}", info.frame_len());

    Ok(())
}
