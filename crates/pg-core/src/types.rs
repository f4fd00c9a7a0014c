//! Core type definitions for PopGuard
//!
//! Identifiers and timestamps follow the browser extension API: tab and
//! window ids are signed 32-bit integers, times are milliseconds since the
//! Unix epoch.

// =============================================================================
// Identifiers
// =============================================================================

/// Browser tab identifier.
pub type TabId = i32;

/// Browser window identifier.
pub type WindowId = i32;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

// =============================================================================
// Engine Constants
// =============================================================================

/// A user gesture older than this no longer counts as "recent".
pub const INTERACTION_RECENT_MS: Millis = 1_000;

/// Horizon for counting popup attempts from the same opener.
pub const BURST_WINDOW_MS: Millis = 5_000;

/// Scores at or above this close the new tab/window.
pub const BLOCK_THRESHOLD: f64 = 50.0;

/// Tracker entries older than this are evicted by the janitor.
pub const RETENTION_MS: Millis = 600_000;

/// How often the janitor sweeps.
pub const JANITOR_INTERVAL_MS: Millis = 300_000;

/// Minimum number of red flags before an element is reported.
pub const MIN_SUSPICIOUS_FLAGS: u32 = 2;

// Score weights
pub const NO_INTERACTION_WEIGHT: f64 = 30.0;
pub const ATTEMPT_WEIGHT: f64 = 20.0;
pub const PLAY_BUTTON_WEIGHT: f64 = 25.0;
pub const HIDDEN_WEIGHT: f64 = 40.0;

// =============================================================================
// Element Signal Flags
// =============================================================================

bitflags::bitflags! {
    /// Red flags raised by the element heuristic.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SignalFlags: u8 {
        /// display:none, visibility:hidden, opacity 0 or no layout box
        const HIDDEN = 1 << 0;
        /// Text, class or id mentions play/video/watch/...
        const PLAY_BUTTON = 1 << 1;
        /// Inline or programmatic click handler
        const CLICK_HANDLER = 1 << 2;
        /// position:absolute
        const ABSOLUTE = 1 << 3;
        /// position:fixed
        const FIXED = 1 << 4;
        /// Covers more than half of the viewport
        const LARGE_OVERLAY = 1 << 5;
    }
}

// =============================================================================
// Element Signal
// =============================================================================

/// Structured result of evaluating one DOM element.
///
/// Only produced for elements with at least [`MIN_SUSPICIOUS_FLAGS`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ElementSignal {
    flags: SignalFlags,
}

impl ElementSignal {
    pub fn new(flags: SignalFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> SignalFlags {
        self.flags
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(SignalFlags::HIDDEN)
    }

    pub fn is_play_button_like(&self) -> bool {
        self.flags.contains(SignalFlags::PLAY_BUTTON)
    }

    pub fn has_click_handler(&self) -> bool {
        self.flags.contains(SignalFlags::CLICK_HANDLER)
    }

    pub fn is_absolute_positioned(&self) -> bool {
        self.flags.contains(SignalFlags::ABSOLUTE)
    }

    pub fn is_fixed_positioned(&self) -> bool {
        self.flags.contains(SignalFlags::FIXED)
    }

    pub fn is_large_overlay(&self) -> bool {
        self.flags.contains(SignalFlags::LARGE_OVERLAY)
    }

    /// Number of raised flags.
    pub fn suspicious_count(&self) -> u32 {
        self.flags.bits().count_ones()
    }

    /// Whether this signal is strong enough to be reported.
    pub fn is_reportable(&self) -> bool {
        self.suspicious_count() >= MIN_SUSPICIOUS_FLAGS
    }
}

impl From<SignalFlags> for ElementSignal {
    fn from(flags: SignalFlags) -> Self {
        Self::new(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspicious_count() {
        assert_eq!(ElementSignal::default().suspicious_count(), 0);
        let signal = ElementSignal::new(SignalFlags::HIDDEN | SignalFlags::FIXED);
        assert_eq!(signal.suspicious_count(), 2);
        assert!(signal.is_hidden());
        assert!(signal.is_fixed_positioned());
        assert!(!signal.is_play_button_like());
    }

    #[test]
    fn test_reportable_boundary() {
        assert!(!ElementSignal::new(SignalFlags::PLAY_BUTTON).is_reportable());
        assert!(ElementSignal::new(SignalFlags::PLAY_BUTTON | SignalFlags::CLICK_HANDLER).is_reportable());
        assert!(ElementSignal::new(SignalFlags::all()).is_reportable());
        assert_eq!(ElementSignal::new(SignalFlags::all()).suspicious_count(), 6);
    }
}
