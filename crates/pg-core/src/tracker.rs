//! Per-tab interaction and popup-attempt tracking.
//!
//! Both trackers create entries on write and never on read. Old data is
//! only evicted by the janitor or when a tab closes, which keeps the
//! scoring path free of side effects.

use std::collections::HashMap;

use crate::types::{ElementSignal, Millis, TabId};

// =============================================================================
// Interaction Tracker
// =============================================================================

/// User activity observed in one tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabInteraction {
    /// Time of the last user gesture, 0 until the first one.
    pub last_interaction_at: Millis,
    /// Number of recorded gestures. Never decreases.
    pub click_count: u64,
    /// Suspicious elements reported by the content script, in arrival order.
    pub suspicious_elements: Vec<ElementSignal>,
}

/// Per-tab record of user gestures and suspicious element reports.
#[derive(Debug, Default)]
pub struct InteractionTracker {
    tabs: HashMap<TabId, TabInteraction>,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user gesture in `tab_id` at `at`.
    pub fn record_interaction(&mut self, tab_id: TabId, at: Millis) {
        let entry = self.tabs.entry(tab_id).or_default();
        entry.last_interaction_at = at;
        entry.click_count += 1;
    }

    /// Append a suspicious element report for `tab_id`.
    pub fn record_signal(&mut self, tab_id: TabId, signal: ElementSignal) {
        self.tabs
            .entry(tab_id)
            .or_default()
            .suspicious_elements
            .push(signal);
    }

    /// Look up a tab, falling back to the zero record. Never inserts.
    pub fn get(&self, tab_id: TabId) -> TabInteraction {
        self.tabs.get(&tab_id).cloned().unwrap_or_default()
    }

    /// Borrowing lookup for callers that only need a field or two.
    pub fn peek(&self, tab_id: TabId) -> Option<&TabInteraction> {
        self.tabs.get(&tab_id)
    }

    /// Last gesture time for `tab_id`, 0 if unknown.
    pub fn last_interaction_at(&self, tab_id: TabId) -> Millis {
        self.tabs.get(&tab_id).map_or(0, |t| t.last_interaction_at)
    }

    /// Drop the tab's record. Returns whether one existed.
    pub fn remove(&mut self, tab_id: TabId) -> bool {
        self.tabs.remove(&tab_id).is_some()
    }

    /// Drop every record whose last gesture is before `cutoff`.
    /// Returns the number of records removed.
    pub fn evict_before(&mut self, cutoff: Millis) -> usize {
        let before = self.tabs.len();
        self.tabs.retain(|_, t| t.last_interaction_at >= cutoff);
        before - self.tabs.len()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

// =============================================================================
// Attempt Tracker
// =============================================================================

/// Per-opener log of popup creation times.
#[derive(Debug, Default)]
pub struct AttemptTracker {
    openers: HashMap<TabId, Vec<Millis>>,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a creation event attributed to `opener`.
    pub fn record_attempt(&mut self, opener: TabId, at: Millis) {
        self.openers.entry(opener).or_default().push(at);
    }

    /// Count attempts strictly newer than `at - window_ms`.
    pub fn count_recent(&self, opener: TabId, at: Millis, window_ms: Millis) -> usize {
        let cutoff = at.saturating_sub(window_ms);
        self.openers
            .get(&opener)
            .map_or(0, |times| times.iter().filter(|&&t| t > cutoff).count())
    }

    /// Stored timestamps for `opener`, in insertion order.
    pub fn timestamps(&self, opener: TabId) -> &[Millis] {
        self.openers.get(&opener).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop the opener's log. Returns whether one existed.
    pub fn remove(&mut self, opener: TabId) -> bool {
        self.openers.remove(&opener).is_some()
    }

    /// Drop timestamps at or before `cutoff`, then any opener left empty.
    /// Returns the number of timestamps removed.
    pub fn evict_before(&mut self, cutoff: Millis) -> usize {
        let mut removed = 0;
        self.openers.retain(|_, times| {
            let before = times.len();
            times.retain(|&t| t > cutoff);
            removed += before - times.len();
            !times.is_empty()
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.openers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openers.is_empty()
    }
}
