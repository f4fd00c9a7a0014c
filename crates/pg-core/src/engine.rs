//! Event handling over the owned tracker state.
//!
//! The engine is the single owner of the trackers, the settings snapshot
//! and the block statistics. Inbound events mutate it; scoring only reads.

use crate::config::{Configuration, SettingsStore};
use crate::janitor::{Janitor, SweepReport};
use crate::scorer::{self, ScoreContext};
use crate::stats::BlockStats;
use crate::tracker::{AttemptTracker, InteractionTracker};
use crate::types::{ElementSignal, Millis, TabId};

#[derive(Debug, Default)]
pub struct Engine {
    settings: SettingsStore,
    interactions: InteractionTracker,
    attempts: AttemptTracker,
    stats: BlockStats,
    janitor: Janitor,
}

impl Engine {
    /// Create an engine with no configuration loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Configuration) -> Self {
        Self {
            settings: SettingsStore::with_config(config),
            ..Self::default()
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    /// Publish a new configuration snapshot. Returns its version.
    pub fn apply_settings(&mut self, config: Configuration) -> u64 {
        self.settings.publish(config)
    }

    pub fn config(&self) -> Option<&Configuration> {
        self.settings.current()
    }

    // =========================================================================
    // Inbound Events
    // =========================================================================

    pub fn user_interaction(&mut self, tab_id: TabId, at: Millis) {
        self.interactions.record_interaction(tab_id, at);
    }

    /// Record a suspicious element report. Signals below the reporting
    /// threshold are dropped; returns whether the signal was stored.
    pub fn suspicious_element_detected(&mut self, tab_id: TabId, signal: ElementSignal) -> bool {
        if !signal.is_reportable() {
            log::debug!(
                "tab {}: dropped signal with {} flag(s): {:?}",
                tab_id,
                signal.suspicious_count(),
                signal.flags()
            );
            return false;
        }
        log::debug!(
            "tab {}: suspicious element ({} flags: {:?})",
            tab_id,
            signal.suspicious_count(),
            signal.flags()
        );
        self.interactions.record_signal(tab_id, signal);
        true
    }

    pub fn record_attempt(&mut self, opener: TabId, at: Millis) {
        self.attempts.record_attempt(opener, at);
    }

    /// Forget everything about a closed tab.
    pub fn tab_removed(&mut self, tab_id: TabId) {
        let had_interaction = self.interactions.remove(tab_id);
        let had_attempts = self.attempts.remove(tab_id);
        if had_interaction || had_attempts {
            log::debug!("tab {} closed, tracker entries dropped", tab_id);
        }
    }

    pub fn record_block(&mut self, opener_url: &str) {
        self.stats.record_block(opener_url);
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    pub fn score(&self, tab_id: TabId, url: &str, ctx: &ScoreContext, now: Millis) -> f64 {
        scorer::score(
            self.settings.current(),
            &self.interactions,
            &self.attempts,
            tab_id,
            url,
            ctx,
            now,
        )
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Start the janitor schedule at `now`.
    pub fn start_janitor(&mut self, now: Millis) {
        self.janitor.start(now);
    }

    /// Sweep now, regardless of schedule.
    pub fn sweep(&mut self, now: Millis) -> SweepReport {
        self.janitor
            .sweep(&mut self.interactions, &mut self.attempts, now)
    }

    /// Sweep if the janitor interval has elapsed.
    pub fn tick(&mut self, now: Millis) -> Option<SweepReport> {
        if self.janitor.is_due(now) {
            Some(self.sweep(now))
        } else {
            None
        }
    }

    pub fn interactions(&self) -> &InteractionTracker {
        &self.interactions
    }

    pub fn attempts(&self) -> &AttemptTracker {
        &self.attempts
    }

    pub fn stats(&self) -> &BlockStats {
        &self.stats
    }

    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }
}
