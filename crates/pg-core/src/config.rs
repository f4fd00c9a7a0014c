//! Effective configuration and the versioned settings store.
//!
//! The persisted settings document belongs to the extension; the engine
//! only ever sees the latest published [`Configuration`] snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Domains whitelisted on a fresh install.
pub const DEFAULT_WHITELIST: [&str; 3] = ["google.com", "gmail.com", "github.com"];

/// Neutral aggressiveness (multiplier 1.0).
pub const DEFAULT_AGGRESSIVENESS: u8 = 2;

/// Effective engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub blocking_enabled: bool,
    /// Domains matched as substrings of the opener URL.
    pub whitelist: BTreeSet<String>,
    /// 1 = low, 2 = medium, 3 = high.
    pub aggressiveness: u8,
    pub detect_play_buttons: bool,
    /// Persisted but not consulted by the scorer.
    pub detect_multi_popups: bool,
    /// Persisted but not consulted by the scorer.
    pub detect_no_interaction: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            whitelist: DEFAULT_WHITELIST.iter().map(|d| d.to_string()).collect(),
            aggressiveness: DEFAULT_AGGRESSIVENESS,
            detect_play_buttons: true,
            detect_multi_popups: true,
            detect_no_interaction: true,
        }
    }
}

impl Configuration {
    /// Check whether any whitelisted domain occurs in `url`.
    pub fn is_whitelisted(&self, url: &str) -> bool {
        self.whitelist.iter().any(|domain| url.contains(domain.as_str()))
    }

    /// Linear score multiplier: 1 halves, 2 is neutral, 3 scales by 1.5.
    #[inline]
    pub fn aggressiveness_multiplier(&self) -> f64 {
        f64::from(self.aggressiveness) / 2.0
    }
}

// =============================================================================
// Settings Store
// =============================================================================

type Subscriber = Box<dyn Fn(&Configuration, u64)>;

/// Single owner of the current configuration snapshot.
///
/// Every [`publish`](Self::publish) bumps the version and notifies all
/// subscribers in registration order. Until the first publish there is no
/// configuration and the scorer fails open.
#[derive(Default)]
pub struct SettingsStore {
    current: Option<Arc<Configuration>>,
    version: u64,
    subscribers: Vec<Subscriber>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `config` at version 1.
    pub fn with_config(config: Configuration) -> Self {
        let mut store = Self::new();
        store.publish(config);
        store
    }

    /// Replace the snapshot and notify subscribers. Returns the new version.
    pub fn publish(&mut self, config: Configuration) -> u64 {
        self.version += 1;
        let config = Arc::new(config);
        log::debug!(
            "settings v{}: blocking={} aggressiveness={} whitelist={}",
            self.version,
            config.blocking_enabled,
            config.aggressiveness,
            config.whitelist.len()
        );
        for subscriber in &self.subscribers {
            subscriber(&config, self.version);
        }
        self.current = Some(config);
        self.version
    }

    /// Register a callback invoked on every publish.
    pub fn subscribe<F>(&mut self, f: F)
    where
        F: Fn(&Configuration, u64) + 'static,
    {
        self.subscribers.push(Box::new(f));
    }

    /// Current snapshot, if one has been published.
    pub fn current(&self) -> Option<&Configuration> {
        self.current.as_deref()
    }

    /// Shared handle to the current snapshot.
    pub fn snapshot(&self) -> Option<Arc<Configuration>> {
        self.current.clone()
    }

    /// 0 until the first publish.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("current", &self.current)
            .field("version", &self.version)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
