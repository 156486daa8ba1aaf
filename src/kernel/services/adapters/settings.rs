//! 应用数据目录与设置文件
//!
//! - macOS: ~/Library/Application Support/codepad
//! - Linux: $XDG_DATA_HOME/codepad 或 ~/.local/share/codepad
//! - Windows: %APPDATA%\codepad

use crate::kernel::services::ports::settings::Settings;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_NAME: &str = "codepad";
const SETTINGS_FILE: &str = "settings.json";
const STORE_FILE: &str = "workspace.json";
const LOG_DIR: &str = "logs";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot determine application data directory")]
    NoDataDir,
    #[error("settings IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn get_app_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        return std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support").join(APP_NAME));
    }

    #[cfg(target_os = "linux")]
    {
        // 优先使用 XDG_DATA_HOME，否则使用 ~/.local/share
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return Some(PathBuf::from(xdg).join(APP_NAME));
        }
        return std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".local/share").join(APP_NAME));
    }

    #[cfg(target_os = "windows")]
    {
        return std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_NAME));
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

pub fn get_settings_path() -> Option<PathBuf> {
    get_app_data_dir().map(|dir| dir.join(SETTINGS_FILE))
}

pub fn get_store_path() -> Option<PathBuf> {
    get_app_data_dir().map(|dir| dir.join(STORE_FILE))
}

pub fn get_log_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|dir| dir.join(LOG_DIR))
}

pub fn ensure_log_dir() -> Result<PathBuf, SettingsError> {
    let dir = get_log_dir().ok_or(SettingsError::NoDataDir)?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Writes default settings to `path` if nothing is there yet.
pub fn ensure_settings_file_at(path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if !path.exists() {
        let content = serde_json::to_string_pretty(&Settings::default())?;
        std::fs::write(path, content)?;
    }
    Ok(())
}

pub fn ensure_settings_file() -> Result<PathBuf, SettingsError> {
    let path = get_settings_path().ok_or(SettingsError::NoDataDir)?;
    ensure_settings_file_at(&path)?;
    Ok(path)
}

pub fn load_settings_from(path: &Path) -> Result<Settings, SettingsError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Settings from the default location; defaults when missing. An invalid
/// file is an error so the caller can report it once logging is up.
pub fn load_settings() -> Result<Settings, SettingsError> {
    let Some(path) = get_settings_path() else {
        return Ok(Settings::default());
    };
    if !path.exists() {
        return Ok(Settings::default());
    }
    load_settings_from(&path)
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/settings.rs"]
mod tests;
