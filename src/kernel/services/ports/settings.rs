use crate::models::DEFAULT_THEME;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub autosave_delay_ms: u64,
    pub search_debounce_ms: u64,
    pub default_language: String,
    pub default_version: String,
    pub theme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            default_language: "javascript".to_string(),
            default_version: "es2022".to_string(),
            theme: DEFAULT_THEME.to_string(),
            log_filter: None,
        }
    }
}

impl Settings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;
