//! Periodic eviction of stale tracker entries.
//!
//! Scoring windows on its own 1s/5s horizons, so the janitor only bounds
//! memory. Nothing it does changes a score.

use crate::tracker::{AttemptTracker, InteractionTracker};
use crate::types::{Millis, JANITOR_INTERVAL_MS, RETENTION_MS};

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub timestamps_removed: usize,
    pub openers_remaining: usize,
    pub interactions_removed: usize,
    pub interactions_remaining: usize,
}

/// Sweep schedule.
#[derive(Debug, Clone)]
pub struct Janitor {
    interval_ms: Millis,
    retention_ms: Millis,
    last_run: Option<Millis>,
}

impl Default for Janitor {
    fn default() -> Self {
        Self::new(JANITOR_INTERVAL_MS, RETENTION_MS)
    }
}

impl Janitor {
    pub fn new(interval_ms: Millis, retention_ms: Millis) -> Self {
        Self {
            interval_ms,
            retention_ms,
            last_run: None,
        }
    }

    pub fn interval_ms(&self) -> Millis {
        self.interval_ms
    }

    pub fn last_run(&self) -> Option<Millis> {
        self.last_run
    }

    /// The first sweep is due one interval after `started_at`.
    pub fn start(&mut self, started_at: Millis) {
        self.last_run = Some(started_at);
    }

    pub fn is_due(&self, now: Millis) -> bool {
        match self.last_run {
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    /// Evict everything older than the retention horizon and mark the run.
    pub fn sweep(
        &mut self,
        interactions: &mut InteractionTracker,
        attempts: &mut AttemptTracker,
        now: Millis,
    ) -> SweepReport {
        let cutoff = now.saturating_sub(self.retention_ms);
        let timestamps_removed = attempts.evict_before(cutoff);
        let interactions_removed = interactions.evict_before(cutoff);
        self.last_run = Some(now);

        let report = SweepReport {
            timestamps_removed,
            openers_remaining: attempts.len(),
            interactions_removed,
            interactions_remaining: interactions.len(),
        };
        log::debug!("janitor sweep at {}: {:?}", now, report);
        report
    }
}
