use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::store::{read_json, write_json, StoreError};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_MAX_REPLAY_STEPS: usize = 100_000;

/// Application-level settings stored in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppSettings {
    pub version: u32,
    /// JSON file holding the script library.
    pub scripts_path: PathBuf,
    /// Address the HTTP service listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Upper bound on instructions executed by `replay`.
    #[serde(default = "default_max_replay_steps")]
    #[ts(type = "number")]
    pub max_replay_steps: usize,
}

const SETTINGS_VERSION: u32 = 1;

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_max_replay_steps() -> usize {
    DEFAULT_MAX_REPLAY_STEPS
}

impl AppSettings {
    pub fn new(scripts_path: PathBuf) -> Self {
        Self {
            version: SETTINGS_VERSION,
            scripts_path,
            bind_addr: default_bind_addr(),
            log_filter: default_log_filter(),
            max_replay_steps: default_max_replay_steps(),
        }
    }

    /// Defaults rooted at `app_config_dir`.
    pub fn defaults_for(app_config_dir: &Path) -> Self {
        Self::new(crate::paths::default_scripts_path(app_config_dir))
    }
}

/// Load settings from the app config directory. Returns None if no settings file exists
/// or it cannot be parsed.
pub fn load_settings(app_config_dir: &Path) -> Option<AppSettings> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return None;
    }
    match read_json::<AppSettings>(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("ignoring unreadable settings: {e}");
            None
        }
    }
}

/// Load settings, falling back to defaults for `app_config_dir`.
pub fn load_or_default(app_config_dir: &Path) -> AppSettings {
    load_settings(app_config_dir).unwrap_or_else(|| AppSettings::defaults_for(app_config_dir))
}

/// Save settings to the app config directory.
pub fn save_settings(app_config_dir: &Path, settings: &AppSettings) -> Result<(), StoreError> {
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}
