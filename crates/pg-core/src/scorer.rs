//! Spam score computation
//!
//! The scorer is the decision authority for every popup attempt. It is a
//! pure function of the configuration snapshot, the tracker state and the
//! caller-supplied context. It never mutates the trackers.

use crate::config::Configuration;
use crate::tracker::{AttemptTracker, InteractionTracker};
use crate::types::{
    Millis, TabId, ATTEMPT_WEIGHT, BURST_WINDOW_MS, HIDDEN_WEIGHT, INTERACTION_RECENT_MS,
    NO_INTERACTION_WEIGHT, PLAY_BUTTON_WEIGHT,
};

/// Element context attached to a specific popup attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ScoreContext {
    pub is_play_button: bool,
    pub is_hidden: bool,
}

/// Compute the spam score for a popup attempt from `tab_id` at `now`.
///
/// A missing configuration scores 0 (fail open), as does disabled blocking
/// or a whitelisted `url`. The result is non-negative and unclamped.
pub fn score(
    config: Option<&Configuration>,
    interactions: &InteractionTracker,
    attempts: &AttemptTracker,
    tab_id: TabId,
    url: &str,
    ctx: &ScoreContext,
    now: Millis,
) -> f64 {
    let config = match config {
        Some(config) if config.blocking_enabled => config,
        _ => return 0.0,
    };

    if config.is_whitelisted(url) {
        return 0.0;
    }

    let mut score = 0.0;

    // No recent user gesture
    let last_interaction = interactions.last_interaction_at(tab_id);
    if now.saturating_sub(last_interaction) > INTERACTION_RECENT_MS {
        score += NO_INTERACTION_WEIGHT;
    }

    // Burst of popups from the same opener
    let recent_attempts = attempts.count_recent(tab_id, now, BURST_WINDOW_MS);
    score += recent_attempts as f64 * ATTEMPT_WEIGHT;

    if ctx.is_play_button && config.detect_play_buttons {
        score += PLAY_BUTTON_WEIGHT;
    }

    // Hidden triggers count regardless of the detection toggles
    if ctx.is_hidden {
        score += HIDDEN_WEIGHT;
    }

    score * config.aggressiveness_multiplier()
}
