//! Suspicious DOM element detection
//!
//! Runs in the content script for every element on a click path and every
//! newly inserted element. The heuristic only computes a value; recording
//! and forwarding the signal is the caller's job.

use crate::config::Configuration;
use crate::types::{ElementSignal, SignalFlags};

/// Substrings that make an element look like a bait play button.
pub const PLAY_PATTERNS: [&str; 6] = ["play", "video", "watch", "stream", "movie", "episode"];

/// Fraction of the viewport an element must exceed to count as an overlay.
pub const OVERLAY_VIEWPORT_FRACTION: f64 = 0.5;

// =============================================================================
// Element View
// =============================================================================

/// Computed CSS `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    /// Parse a computed style value. Unknown values are treated as static.
    pub fn from_css(s: &str) -> Self {
        match s.trim() {
            "relative" => Self::Relative,
            "absolute" => Self::Absolute,
            "fixed" => Self::Fixed,
            "sticky" => Self::Sticky,
            _ => Self::Static,
        }
    }
}

/// Read-only view of a rendered element and its computed style.
pub trait ElementView {
    /// Computed `display` is `none`.
    fn is_display_none(&self) -> bool;
    /// Computed `visibility` is `hidden`.
    fn is_visibility_hidden(&self) -> bool;
    /// Computed `opacity`.
    fn opacity(&self) -> f64;
    /// Element takes part in layout (has an offset parent).
    fn has_layout_box(&self) -> bool;
    fn text(&self) -> &str;
    fn class_name(&self) -> &str;
    fn id(&self) -> &str;
    /// Inline `onclick` attribute or a programmatic `onclick` property.
    fn has_click_handler(&self) -> bool;
    fn position(&self) -> Position;
    /// Rendered `(width, height)` in CSS pixels.
    fn size(&self) -> (f64, f64);
    /// Viewport `(width, height)` in CSS pixels.
    fn viewport(&self) -> (f64, f64);
    /// The document `<body>`, where click-path walks stop.
    fn is_body(&self) -> bool {
        false
    }
}

// =============================================================================
// Flag Computation
// =============================================================================

pub fn is_hidden<E: ElementView + ?Sized>(el: &E) -> bool {
    el.is_display_none() || el.is_visibility_hidden() || el.opacity() == 0.0 || !el.has_layout_box()
}

pub fn is_play_button_like<E: ElementView + ?Sized>(el: &E) -> bool {
    let fields = [el.text(), el.class_name(), el.id()];
    PLAY_PATTERNS.iter().any(|pattern| {
        fields
            .iter()
            .any(|field| contains_ignore_ascii_case(field, pattern))
    })
}

pub fn is_large_overlay<E: ElementView + ?Sized>(el: &E) -> bool {
    let (width, height) = el.size();
    if width == 0.0 || height == 0.0 {
        return false;
    }
    let (vw, vh) = el.viewport();
    width * height > vw * vh * OVERLAY_VIEWPORT_FRACTION
}

/// Compute all six flags without applying the reporting policy.
pub fn compute_flags<E: ElementView + ?Sized>(el: &E) -> SignalFlags {
    let mut flags = SignalFlags::empty();
    flags.set(SignalFlags::HIDDEN, is_hidden(el));
    flags.set(SignalFlags::PLAY_BUTTON, is_play_button_like(el));
    flags.set(SignalFlags::CLICK_HANDLER, el.has_click_handler());

    let position = el.position();
    flags.set(SignalFlags::ABSOLUTE, position == Position::Absolute);
    flags.set(SignalFlags::FIXED, position == Position::Fixed);

    flags.set(SignalFlags::LARGE_OVERLAY, is_large_overlay(el));
    flags
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate one element.
///
/// Returns a signal only if play-button detection is enabled and at least
/// two flags are raised. With detection disabled nothing is ever reported.
pub fn evaluate<E: ElementView + ?Sized>(el: &E, config: &Configuration) -> Option<ElementSignal> {
    if !config.detect_play_buttons {
        return None;
    }

    let signal = ElementSignal::new(compute_flags(el));
    signal.is_reportable().then_some(signal)
}

/// Evaluate a click target followed by its ancestors, stopping at `<body>`.
pub fn evaluate_click_path<'e, E, I>(path: I, config: &Configuration) -> Vec<ElementSignal>
where
    E: ElementView + ?Sized + 'e,
    I: IntoIterator<Item = &'e E>,
{
    path.into_iter()
        .take_while(|el| !el.is_body())
        .filter_map(|el| evaluate(el, config))
        .collect()
}

#[inline]
fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() {
        return true;
    }
    if h.len() < n.len() {
        return false;
    }
    h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

// =============================================================================
// Element Snapshot
// =============================================================================

/// Owned element description, as captured by the content script.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub opacity: f64,
    pub has_layout_box: bool,
    pub text: String,
    pub class_name: String,
    pub id: String,
    pub has_click_handler: bool,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub is_body: bool,
}

impl Default for ElementSnapshot {
    fn default() -> Self {
        Self {
            display_none: false,
            visibility_hidden: false,
            opacity: 1.0,
            has_layout_box: true,
            text: String::new(),
            class_name: String::new(),
            id: String::new(),
            has_click_handler: false,
            position: Position::Static,
            width: 0.0,
            height: 0.0,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            is_body: false,
        }
    }
}

impl ElementView for ElementSnapshot {
    fn is_display_none(&self) -> bool {
        self.display_none
    }

    fn is_visibility_hidden(&self) -> bool {
        self.visibility_hidden
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn has_layout_box(&self) -> bool {
        self.has_layout_box
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn has_click_handler(&self) -> bool {
        self.has_click_handler
    }

    fn position(&self) -> Position {
        self.position
    }

    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn viewport(&self) -> (f64, f64) {
        (self.viewport_width, self.viewport_height)
    }

    fn is_body(&self) -> bool {
        self.is_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::default()
    }

    #[test]
    fn test_plain_element_not_reported() {
        let el = ElementSnapshot::default();
        assert_eq!(compute_flags(&el), SignalFlags::empty());
        assert_eq!(evaluate(&el, &config()), None);
    }

    #[test]
    fn test_single_flag_not_reported() {
        let el = ElementSnapshot {
            text: "Play now".to_string(),
            ..Default::default()
        };
        assert_eq!(compute_flags(&el), SignalFlags::PLAY_BUTTON);
        assert_eq!(evaluate(&el, &config()), None);
    }

    #[test]
    fn test_two_flags_reported() {
        let el = ElementSnapshot {
            class_name: "btn-WATCH".to_string(),
            has_click_handler: true,
            ..Default::default()
        };
        let signal = evaluate(&el, &config()).unwrap();
        assert!(signal.is_play_button_like());
        assert!(signal.has_click_handler());
        assert_eq!(signal.suspicious_count(), 2);
    }

    #[test]
    fn test_detect_play_buttons_off_suppresses_everything() {
        let el = ElementSnapshot {
            display_none: true,
            position: Position::Fixed,
            has_click_handler: true,
            ..Default::default()
        };
        let mut cfg = config();
        cfg.detect_play_buttons = false;
        assert_eq!(evaluate(&el, &cfg), None);
        assert!(evaluate(&el, &config()).is_some());
    }

    #[test]
    fn test_hidden_variants() {
        let base = ElementSnapshot::default();
        assert!(!is_hidden(&base));
        assert!(is_hidden(&ElementSnapshot { display_none: true, ..base.clone() }));
        assert!(is_hidden(&ElementSnapshot { visibility_hidden: true, ..base.clone() }));
        assert!(is_hidden(&ElementSnapshot { opacity: 0.0, ..base.clone() }));
        assert!(is_hidden(&ElementSnapshot { has_layout_box: false, ..base.clone() }));
        assert!(!is_hidden(&ElementSnapshot { opacity: 0.01, ..base }));
    }

    #[test]
    fn test_play_patterns_on_id() {
        let el = ElementSnapshot {
            id: "EpisodeLink".to_string(),
            ..Default::default()
        };
        assert!(is_play_button_like(&el));
        assert!(!is_play_button_like(&ElementSnapshot {
            text: "Subscribe".to_string(),
            ..Default::default()
        }));
    }

    #[test]
    fn test_large_overlay() {
        let overlay = ElementSnapshot {
            width: 1280.0,
            height: 600.0,
            ..Default::default()
        };
        assert!(is_large_overlay(&overlay));

        let exactly_half = ElementSnapshot {
            width: 640.0,
            height: 800.0,
            ..Default::default()
        };
        assert!(!is_large_overlay(&exactly_half));

        let zero_height = ElementSnapshot {
            width: 5000.0,
            height: 0.0,
            ..Default::default()
        };
        assert!(!is_large_overlay(&zero_height));
    }

    #[test]
    fn test_position_flags() {
        let fixed = ElementSnapshot {
            position: Position::from_css("fixed"),
            ..Default::default()
        };
        assert_eq!(compute_flags(&fixed), SignalFlags::FIXED);
        let absolute = ElementSnapshot {
            position: Position::from_css("absolute"),
            ..Default::default()
        };
        assert_eq!(compute_flags(&absolute), SignalFlags::ABSOLUTE);
        assert_eq!(Position::from_css("inherit"), Position::Static);
    }

    #[test]
    fn test_click_path_stops_at_body() {
        let target = ElementSnapshot {
            text: "play".to_string(),
            has_click_handler: true,
            ..Default::default()
        };
        let wrapper = ElementSnapshot::default();
        let overlay = ElementSnapshot {
            position: Position::Fixed,
            width: 1280.0,
            height: 800.0,
            ..Default::default()
        };
        let body = ElementSnapshot {
            is_body: true,
            position: Position::Fixed,
            has_click_handler: true,
            ..Default::default()
        };
        let path = [target, wrapper, overlay, body];
        let signals = evaluate_click_path(path.iter(), &config());
        assert_eq!(signals.len(), 2);
        assert!(signals[0].is_play_button_like());
        assert!(signals[1].is_large_overlay());
    }
}
