//! PupilTrack CLI: pupil size and position tracking for eye videos.
//!
//! Usage:
//!   pupiltrack track <INPUT> [OPTIONS]   Measure the pupil in every sampled frame
//!   pupiltrack probe <INPUT>             Show video dimensions and frame rate
//!   pupiltrack check                     Check that ffmpeg and ffprobe are available

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pupiltrack_common::config::{config_file_path, LoggingConfig, TrackerConfig};
use pupiltrack_common::error::PupilError;

mod commands;

#[derive(Parser)]
#[command(
    name = "pupiltrack",
    about = "Pupil size and position tracking for eye videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the pupil through a video or image sequence
    Track(commands::track::TrackArgs),

    /// Show video stream information
    Probe {
        /// Path to the video file
        input: PathBuf,
    },

    /// Check external tool availability
    Check,
}

/// Logging settings from the user config file, with flag overrides.
///
/// A broken config file is returned rather than logged, since the
/// subscriber is not installed yet.
fn startup_logging(
    config_path: &Path,
    verbose: bool,
    json: bool,
) -> (LoggingConfig, Option<PupilError>) {
    let (mut logging, error) = match TrackerConfig::load_from(config_path) {
        Ok(config) => (config.logging, None),
        Err(PupilError::FileNotFound { .. }) => (LoggingConfig::default(), None),
        Err(e) => (LoggingConfig::default(), Some(e)),
    };
    if verbose {
        logging.level = "debug".to_string();
    }
    logging.json |= json;
    (logging, error)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = config_file_path();
    let (logging, config_error) = startup_logging(&config_path, cli.verbose, cli.json_logs);
    pupiltrack_common::logging::init_logging(&logging);
    if let Some(e) = config_error {
        tracing::warn!(path = %config_path.display(), error = %e, "Ignoring unreadable config file");
    }

    match cli.command {
        Commands::Track(args) => commands::track::run(args).await,
        Commands::Probe { input } => commands::probe::run(input),
        Commands::Check => commands::check::run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_config_error_is_deferred() {
        let path = std::env::temp_dir().join("pupiltrack_cli_malformed.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (logging, error) = startup_logging(&path, false, false);
        assert_eq!(logging, LoggingConfig::default());
        assert!(matches!(error, Some(PupilError::Json(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_config_is_silent_and_flags_apply() {
        let path = std::env::temp_dir().join("pupiltrack_cli_absent.json");
        let _ = std::fs::remove_file(&path);

        let (logging, error) = startup_logging(&path, true, true);
        assert!(error.is_none());
        assert_eq!(logging.level, "debug");
        assert!(logging.json);
    }

    #[test]
    fn test_config_logging_section_is_used() {
        let path = std::env::temp_dir().join("pupiltrack_cli_logging.json");
        std::fs::write(&path, r#"{ "logging": { "level": "warn", "json": true } }"#).unwrap();

        let (logging, error) = startup_logging(&path, false, false);
        assert!(error.is_none());
        assert_eq!(logging.level, "warn");
        assert!(logging.json);
        std::fs::remove_file(&path).ok();
    }
}
