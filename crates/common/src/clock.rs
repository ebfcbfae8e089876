//! Clock utilities.
//!
//! Measurements are stamped with local wall-clock time at the moment they
//! are emitted, at one-second resolution. The stamp is not
//! derived from the video playback position.

use std::time::{Duration, Instant};

use chrono::{NaiveTime, Timelike};

/// Format used for measurement timestamps.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Source of wall-clock time for emitted measurements.
pub trait WallClock {
    /// Current local time, truncated to whole seconds.
    fn now(&self) -> NaiveTime;
}

/// The system's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveTime {
        truncate_to_second(chrono::Local::now().time())
    }
}

/// A clock frozen at a given time. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveTime);

impl WallClock for FixedClock {
    fn now(&self) -> NaiveTime {
        truncate_to_second(self.0)
    }
}

/// Drop the sub-second part of a time of day.
pub fn truncate_to_second(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

/// Render a timestamp as `HH:MM:SS`.
pub fn format_timestamp(time: NaiveTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Measures the wall-clock duration of a single stage.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_truncates() {
        let time = NaiveTime::from_hms_milli_opt(14, 3, 9, 750).unwrap();
        let clock = FixedClock(time);
        assert_eq!(format_timestamp(clock.now()), "14:03:09");
    }

    #[test]
    fn test_system_clock_has_whole_seconds() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }

    #[test]
    fn test_stopwatch_is_monotonic() {
        let watch = Stopwatch::start();
        let first = watch.elapsed();
        let second = watch.elapsed();
        assert!(second >= first);
        assert!(watch.elapsed_secs() < 1.0);
    }
}
