//! PopGuard Core Library
//!
//! This crate provides the popup scoring engine for the PopGuard extension.
//! It decides, per attempted new tab or window, whether the creation event
//! is an unwanted spam popup that should be closed.
//!
//! # Architecture
//!
//! All state is owned by an [`Engine`] that the extension background page
//! feeds with events. Scoring is a pure read over the trackers; only the
//! event handlers and the janitor mutate them. The [`PopupGate`] is the only
//! component that talks to the browser, through the [`TabPlatform`] trait.
//!
//! # Modules
//!
//! - `types`: Shared type definitions and engine constants
//! - `config`: Effective configuration and the versioned settings store
//! - `tracker`: Per-tab interaction and popup-attempt tracking
//! - `heuristic`: Suspicious DOM element detection
//! - `scorer`: Spam score computation
//! - `engine`: Event handling over the owned tracker state
//! - `gate`: Decision and enforcement for tab/window creation events
//! - `janitor`: Periodic eviction of stale tracker entries
//! - `stats`: Block statistics
//! - `url`: Fast URL host extraction

pub mod config;
pub mod engine;
pub mod gate;
pub mod heuristic;
pub mod janitor;
pub mod scorer;
pub mod stats;
pub mod tracker;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use config::{Configuration, SettingsStore};
pub use engine::Engine;
pub use gate::{GateDecision, GateOutcome, GateTarget, PlatformError, PopupGate, TabInfo, TabPlatform};
pub use heuristic::{evaluate, evaluate_click_path, ElementSnapshot, ElementView, Position};
pub use janitor::{Janitor, SweepReport};
pub use scorer::{score, ScoreContext};
pub use stats::BlockStats;
pub use tracker::{AttemptTracker, InteractionTracker, TabInteraction};
pub use types::{ElementSignal, Millis, SignalFlags, TabId, WindowId};
