//! Logging and tracing initialization.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// Logs go to stderr. Stdout carries the run reports of the CLI and may
/// carry measurement output when the sink writes to a pipe, so log lines
/// must never interleave with it. `RUST_LOG` takes precedence over
/// `config.level`.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::fmt;

    let env_filter = log_filter(&config.level, std::env::var("RUST_LOG").ok());

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Filter from the `RUST_LOG` value when it parses, else from `level`.
///
/// An unparsable `level` falls back to `info`.
pub fn log_filter(level: &str, rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_wins_over_config() {
        let filter = log_filter("info", Some("pupiltrack_vision=trace".to_string()));
        assert_eq!(filter.to_string(), "pupiltrack_vision=trace");
    }

    #[test]
    fn test_config_level_without_rust_log() {
        assert_eq!(log_filter("debug", None).to_string(), "debug");
    }

    #[test]
    fn test_bad_directives_fall_back() {
        assert_eq!(log_filter("info", Some("=[[".to_string())).to_string(), "info");
        assert_eq!(log_filter("=[[", None).to_string(), "info");
    }
}
