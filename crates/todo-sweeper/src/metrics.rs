//! Metrics collection for sweep runs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters accumulated across sweep triggers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepMetrics {
    /// Sweeps that ran to the end (completed or incomplete)
    pub sweep_count: usize,

    /// Triggers dropped because a sweep was already running
    pub skipped_count: usize,

    /// Items moved to past due
    pub expired_total: usize,

    /// Items a sweep could not expire
    pub failed_total: usize,

    /// Sweeps that returned an error or left items behind
    pub failed_sweeps: usize,

    /// Time spent sweeping, in milliseconds
    pub total_runtime_ms: u64,
}

impl SweepMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sweep that handled every candidate
    pub fn record_sweep(&mut self, expired: usize, elapsed: Duration) {
        self.sweep_count += 1;
        self.expired_total += expired;
        self.add_runtime(elapsed);
    }

    /// Record a sweep that committed some items and failed others
    pub fn record_incomplete(&mut self, committed: usize, failed: usize, elapsed: Duration) {
        self.sweep_count += 1;
        self.failed_sweeps += 1;
        self.expired_total += committed;
        self.failed_total += failed;
        self.add_runtime(elapsed);
    }

    /// Record a sweep that could not start
    pub fn record_failure(&mut self, elapsed: Duration) {
        self.failed_sweeps += 1;
        self.add_runtime(elapsed);
    }

    /// Record a trigger dropped by the single-flight guard
    pub fn record_skipped(&mut self) {
        self.skipped_count += 1;
    }

    fn add_runtime(&mut self, elapsed: Duration) {
        self.total_runtime_ms = self
            .total_runtime_ms
            .saturating_add(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Sweep Metrics Summary".to_string(),
            "=====================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Skipped triggers: {}", self.skipped_count),
            format!("Items expired: {}", self.expired_total),
            format!("Items failed: {}", self.failed_total),
            format!("Failed sweeps: {}", self.failed_sweeps),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ]
        .join("\n")
    }
}
