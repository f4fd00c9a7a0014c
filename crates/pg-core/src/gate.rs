//! Decision and enforcement for tab/window creation events.
//!
//! Each creation event runs `Observing -> Evaluating -> {Allowed, Blocked}`
//! on its own. Calls into the browser are the only suspension points; the
//! engine is never borrowed across one, so events from other tabs may
//! interleave freely while a platform call is pending.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::engine::Engine;
use crate::scorer::ScoreContext;
use crate::types::{Millis, TabId, WindowId, BLOCK_THRESHOLD};

// =============================================================================
// Platform Boundary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("tab {0} not found")]
    TabNotFound(TabId),
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
    #[error("browser call failed: {0}")]
    Call(String),
}

/// Minimal tab description returned by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// Browser tab/window API used by the gate.
#[allow(async_fn_in_trait)]
pub trait TabPlatform {
    /// URL of an open tab.
    async fn tab_url(&self, tab_id: TabId) -> Result<String, PlatformError>;
    /// The currently active tab, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>, PlatformError>;
    async fn close_tab(&self, tab_id: TabId) -> Result<(), PlatformError>;
    async fn close_window(&self, window_id: WindowId) -> Result<(), PlatformError>;
}

// =============================================================================
// Outcomes
// =============================================================================

/// Surface a creation event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum GateTarget {
    Tab(TabId),
    Window(WindowId),
}

impl fmt::Display for GateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tab(id) => write!(f, "tab {}", id),
            Self::Window(id) => write!(f, "window {}", id),
        }
    }
}

/// Terminal state of one creation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum GateDecision {
    /// Score below threshold, or the opener could not be looked up.
    Allowed,
    /// The new surface was closed.
    Blocked,
    /// Score crossed the threshold but the close call failed.
    BlockFailed,
    /// No opener context to judge against.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GateOutcome {
    pub target: GateTarget,
    pub opener: Option<TabId>,
    pub score: f64,
    pub decision: GateDecision,
}

impl GateOutcome {
    fn skipped(target: GateTarget) -> Self {
        Self {
            target,
            opener: None,
            score: 0.0,
            decision: GateDecision::Skipped,
        }
    }

    pub fn blocked(&self) -> bool {
        self.decision == GateDecision::Blocked
    }
}

// =============================================================================
// Popup Gate
// =============================================================================

pub struct PopupGate<P> {
    engine: Rc<RefCell<Engine>>,
    platform: P,
}

impl<P: TabPlatform> PopupGate<P> {
    pub fn new(engine: Rc<RefCell<Engine>>, platform: P) -> Self {
        Self { engine, platform }
    }

    pub fn engine(&self) -> &Rc<RefCell<Engine>> {
        &self.engine
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Handle a new tab. Tabs without an opener are not judged.
    pub async fn on_tab_created(
        &self,
        opener: Option<TabId>,
        new_tab: TabId,
        at: Millis,
    ) -> GateOutcome {
        let target = GateTarget::Tab(new_tab);
        let opener = match opener {
            Some(opener) => opener,
            None => return GateOutcome::skipped(target),
        };

        self.engine.borrow_mut().record_attempt(opener, at);

        let opener_url = match self.platform.tab_url(opener).await {
            Ok(url) => url,
            Err(e) => {
                log::warn!("{}: opener tab {} lookup failed: {}", target, opener, e);
                return GateOutcome {
                    target,
                    opener: Some(opener),
                    score: 0.0,
                    decision: GateDecision::Allowed,
                };
            }
        };

        self.evaluate(target, opener, &opener_url, at).await
    }

    /// Handle a new window, judged against the active tab.
    pub async fn on_window_created(&self, window_id: WindowId, at: Millis) -> GateOutcome {
        let target = GateTarget::Window(window_id);
        let active = match self.platform.active_tab().await {
            Ok(Some(tab)) => tab,
            Ok(None) => return GateOutcome::skipped(target),
            Err(e) => {
                log::warn!("{}: active tab lookup failed: {}", target, e);
                return GateOutcome::skipped(target);
            }
        };

        self.evaluate(target, active.id, &active.url, at).await
    }

    async fn evaluate(
        &self,
        target: GateTarget,
        opener: TabId,
        opener_url: &str,
        at: Millis,
    ) -> GateOutcome {
        let score = self
            .engine
            .borrow()
            .score(opener, opener_url, &ScoreContext::default(), at);

        let decision = if score < BLOCK_THRESHOLD {
            GateDecision::Allowed
        } else {
            let closed = match target {
                GateTarget::Tab(id) => self.platform.close_tab(id).await,
                GateTarget::Window(id) => self.platform.close_window(id).await,
            };
            match closed {
                Ok(()) => {
                    self.engine.borrow_mut().record_block(opener_url);
                    GateDecision::Blocked
                }
                Err(e) => {
                    log::warn!("{}: close failed: {}", target, e);
                    GateDecision::BlockFailed
                }
            }
        };

        log::info!(
            "{} from tab {}: blocked={} score={}",
            target,
            opener,
            decision == GateDecision::Blocked,
            score
        );

        GateOutcome {
            target,
            opener: Some(opener),
            score,
            decision,
        }
    }
}
