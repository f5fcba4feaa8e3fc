//! # Sync Metrics
//!
//! Counters and timings for sync passes, kept in memory for diagnostics.

use super::SyncReport;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    pub total_passes: u64,
    /// Passes with no failed or dead-lettered action
    pub clean_passes: u64,
    pub failed_passes: u64,
    pub actions_replayed: u64,
    pub actions_failed: u64,
    pub actions_dead_lettered: u64,
    pub average_pass_duration: Duration,
    pub last_pass_duration: Option<Duration>,
    pub last_pass_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass_start(&mut self) {
        self.last_pass_start = Some(Instant::now());
        self.total_passes += 1;
    }

    pub fn record_pass_end(&mut self, report: &SyncReport) {
        self.actions_replayed += report.succeeded as u64;
        self.actions_failed += report.failed as u64;
        self.actions_dead_lettered += report.dead_lettered.len() as u64;

        if report.is_clean() {
            self.clean_passes += 1;
        } else {
            self.failed_passes += 1;
        }

        if let Some(start) = self.last_pass_start.take() {
            let duration = start.elapsed();
            self.last_pass_duration = Some(duration);

            // Rolling average over finished passes
            let finished = (self.clean_passes + self.failed_passes) as u32;
            let total = self.average_pass_duration * (finished - 1) + duration;
            self.average_pass_duration = total / finished;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_passes == 0 {
            0.0
        } else {
            self.clean_passes as f64 / self.total_passes as f64
        }
    }
}
