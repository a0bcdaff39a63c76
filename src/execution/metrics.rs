//! Execution timers per logical operation.
//!
//! `start` hands out a guard that records the elapsed time when dropped, so a
//! timer is stopped on every exit path of the operation it measures.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::config::ExecutorConfig;

/// Accumulated timings for one operation name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl TimerStats {
    pub fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        u32::try_from(self.count).ok().map(|count| self.total / count)
    }
}

#[derive(Debug)]
pub struct ExecutionMetrics {
    enabled: bool,
    timers: DashMap<&'static str, TimerStats>,
}

impl ExecutionMetrics {
    pub fn new(enabled: bool) -> Self {
        ExecutionMetrics {
            enabled,
            timers: DashMap::new(),
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.metrics_enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start timing `name`; disabled metrics return a guard that records nothing
    pub fn start(&self, name: &'static str) -> TimerContext<'_> {
        TimerContext {
            metrics: self,
            name,
            started: self.enabled.then(Instant::now),
        }
    }

    pub fn snapshot(&self, name: &str) -> Option<TimerStats> {
        self.timers.get(name).map(|stats| *stats)
    }

    pub fn reset(&self) {
        self.timers.clear();
    }

    fn record(&self, name: &'static str, elapsed: Duration) {
        let mut stats = self.timers.entry(name).or_default();
        stats.count += 1;
        stats.total += elapsed;
        stats.max = stats.max.max(elapsed);
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Running timer; records into its `ExecutionMetrics` on drop
#[derive(Debug)]
pub struct TimerContext<'a> {
    metrics: &'a ExecutionMetrics,
    name: &'static str,
    started: Option<Instant>,
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        if let Some(started) = self.started {
            self.metrics.record(self.name, started.elapsed());
        }
    }
}
