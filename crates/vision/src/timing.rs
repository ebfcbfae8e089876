//! Cumulative per-stage timings for a pipeline run.

use std::fmt;
use std::time::Duration;

/// Pipeline stages that are timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Rescale,
    Detect,
    Classify,
    Emit,
    Observe,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Decode,
        Stage::Rescale,
        Stage::Detect,
        Stage::Classify,
        Stage::Emit,
        Stage::Observe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Rescale => "rescale",
            Stage::Detect => "detect",
            Stage::Classify => "classify",
            Stage::Emit => "emit",
            Stage::Observe => "observe",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

/// Call count and total wall time of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStat {
    pub calls: u64,
    pub total: Duration,
}

impl StageStat {
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        self.total.div_f64(self.calls as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTimings {
    stats: [StageStat; 6],
}

impl StageTimings {
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let stat = &mut self.stats[stage.slot()];
        stat.calls += 1;
        stat.total += elapsed;
    }

    pub fn get(&self, stage: Stage) -> StageStat {
        self.stats[stage.slot()]
    }

    pub fn total(&self) -> Duration {
        self.stats.iter().map(|s| s.total).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, StageStat)> + '_ {
        Stage::ALL.iter().map(|&stage| (stage, self.get(stage)))
    }

    /// Emit one log line per stage that ran.
    pub fn log_summary(&self) {
        for (stage, stat) in self.iter().filter(|(_, s)| s.calls > 0) {
            tracing::info!(
                stage = stage.as_str(),
                calls = stat.calls,
                total_ms = stat.total.as_secs_f64() * 1000.0,
                mean_ms = stat.mean().as_secs_f64() * 1000.0,
                "Stage timing"
            );
        }
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>8} {:>12} {:>10}", "stage", "calls", "total (s)", "mean (ms)")?;
        for (stage, stat) in self.iter() {
            writeln!(
                f,
                "{:<10} {:>8} {:>12.3} {:>10.3}",
                stage.as_str(),
                stat.calls,
                stat.total.as_secs_f64(),
                stat.mean().as_secs_f64() * 1000.0
            )?;
        }
        Ok(())
    }
}
