//! Per-call timing statistics for profiling runs.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Wall-clock budget of a profiling run.
pub const PROFILE_BUDGET: Duration = Duration::from_secs(10);

/// Number of entries shown in a report.
pub const REPORT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
struct CallStats {
    calls: u64,
    total: Duration,
    max: Duration,
}

/// Accumulates call counts and cumulative time per label.
#[derive(Debug, Default)]
pub struct CallProfiler {
    stats: HashMap<&'static str, CallStats>,
}

impl CallProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` and charge its wall-clock time to `label`.
    pub fn time<T>(&mut self, label: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(label, start.elapsed());
        out
    }

    pub fn record(&mut self, label: &'static str, elapsed: Duration) {
        let entry = self.stats.entry(label).or_default();
        entry.calls += 1;
        entry.total += elapsed;
        entry.max = entry.max.max(elapsed);
    }

    /// Entries ranked by cumulative time, most expensive first.
    pub fn report(&self) -> ProfileReport {
        let mut entries: Vec<ProfileEntry> = self
            .stats
            .iter()
            .map(|(label, s)| ProfileEntry {
                label: *label,
                calls: s.calls,
                cumulative: s.total,
                max: s.max,
            })
            .collect();
        entries.sort_by(|a, b| b.cumulative.cmp(&a.cumulative).then(a.label.cmp(&b.label)));
        entries.truncate(REPORT_LIMIT);
        ProfileReport { entries }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEntry {
    pub label: &'static str,
    pub calls: u64,
    pub cumulative: Duration,
    pub max: Duration,
}

impl ProfileEntry {
    pub fn per_call(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.cumulative / self.calls as u32
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub entries: Vec<ProfileEntry>,
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>10} {:>14} {:>14} {:>14}",
            "call", "ncalls", "cumtime (ms)", "percall (us)", "max (us)"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "{:<12} {:>10} {:>14.3} {:>14.3} {:>14.3}",
                e.label,
                e.calls,
                e.cumulative.as_secs_f64() * 1_000.0,
                e.per_call().as_secs_f64() * 1_000_000.0,
                e.max.as_secs_f64() * 1_000_000.0
            )?;
        }
        Ok(())
    }
}
