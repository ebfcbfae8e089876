//! Check external tool availability.

use std::process::Command;

fn tool_version(tool: &str) -> Option<String> {
    let output = Command::new(tool).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

pub fn run() -> anyhow::Result<()> {
    println!("PupilTrack System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for tool in ["ffmpeg", "ffprobe"] {
        match tool_version(tool) {
            Some(version) => println!("[OK] {tool}: {version}"),
            None => {
                all_ok = false;
                println!("[MISSING] {tool}: not found on PATH");
            }
        }
    }

    let config_path = pupiltrack_common::config::config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: {} (not present, using defaults)", config_path.display());
    }

    println!();
    if all_ok {
        println!("Video decoding is available. PupilTrack is ready.");
    } else {
        println!("Video input needs ffmpeg and ffprobe. Image sequences (--images) still work.");
    }

    Ok(())
}
