use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pg_core::config::{Configuration, DEFAULT_AGGRESSIVENESS, DEFAULT_WHITELIST};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("aggressiveness must be 1, 2 or 3 (got {0})")]
    Aggressiveness(i64),
}

/// Persisted settings, as stored by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsDocument {
    pub blocking_enabled: bool,
    pub whitelist: Vec<String>,
    pub settings: DetectionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionSettings {
    pub aggressiveness: i64,
    pub detect_play_buttons: bool,
    pub detect_multi_popups: bool,
    pub detect_no_interaction: bool,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            blocking_enabled: true,
            whitelist: DEFAULT_WHITELIST.iter().map(|d| d.to_string()).collect(),
            settings: DetectionSettings::default(),
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            aggressiveness: i64::from(DEFAULT_AGGRESSIVENESS),
            detect_play_buttons: true,
            detect_multi_popups: true,
            detect_no_interaction: true,
        }
    }
}

impl SettingsDocument {
    /// Validate and convert into the engine's configuration.
    pub fn into_configuration(self) -> Result<Configuration, SettingsError> {
        let aggressiveness = match self.settings.aggressiveness {
            n @ 1..=3 => n as u8,
            n => return Err(SettingsError::Aggressiveness(n)),
        };

        let whitelist: BTreeSet<String> = self
            .whitelist
            .iter()
            .map(|domain| domain.trim().to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        if whitelist.len() != self.whitelist.len() {
            log::debug!(
                "whitelist normalized: {} entries -> {}",
                self.whitelist.len(),
                whitelist.len()
            );
        }

        Ok(Configuration {
            blocking_enabled: self.blocking_enabled,
            whitelist,
            aggressiveness,
            detect_play_buttons: self.settings.detect_play_buttons,
            detect_multi_popups: self.settings.detect_multi_popups,
            detect_no_interaction: self.settings.detect_no_interaction,
        })
    }
}

impl From<&Configuration> for SettingsDocument {
    fn from(config: &Configuration) -> Self {
        Self {
            blocking_enabled: config.blocking_enabled,
            whitelist: config.whitelist.iter().cloned().collect(),
            settings: DetectionSettings {
                aggressiveness: i64::from(config.aggressiveness),
                detect_play_buttons: config.detect_play_buttons,
                detect_multi_popups: config.detect_multi_popups,
                detect_no_interaction: config.detect_no_interaction,
            },
        }
    }
}

/// Parse a settings document from JSON.
pub fn parse_settings(json: &str) -> Result<Configuration, SettingsError> {
    let doc: SettingsDocument = serde_json::from_str(json)?;
    doc.into_configuration()
}
