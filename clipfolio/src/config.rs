//! User configuration (`~/.clipboard_config.json`)
//!
//! Every field has a default so partial files load; the minimal file is
//! `{ "hotkey": "ctrl+alt+z" }`. An unparseable hotkey falls back to the
//! default combo without discarding the rest of the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::favorites::DEFAULT_UNDO_LIMIT;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::hotkey::HotkeyCombo;
use crate::persistence::{self, PersistenceResult};
use crate::supervisor::SupervisorConfig;

pub const MAX_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "lenient_hotkey")]
    pub hotkey: HotkeyCombo,
    pub history_limit: usize,
    pub poll_interval_ms: u64,
    pub paste_delay_ms: u64,
    pub undo_limit: usize,
    pub heartbeat_interval_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub stop_grace_ms: u64,
    pub refresh_on_heartbeat: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeyCombo::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            poll_interval_ms: 500,
            paste_delay_ms: 100,
            undo_limit: DEFAULT_UNDO_LIMIT,
            heartbeat_interval_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 8000,
            stop_grace_ms: 1000,
            refresh_on_heartbeat: false,
        }
    }
}

fn lenient_hotkey<'de, D>(deserializer: D) -> Result<HotkeyCombo, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_else(|e| {
        warn!(hotkey = %raw, error = %e, "Invalid hotkey in config, using default");
        HotkeyCombo::default()
    }))
}

impl Config {
    /// Load from `path`. Missing or malformed files yield the defaults.
    pub fn load(path: &Path) -> Self {
        match persistence::read_optional(path) {
            Ok(None) => {
                debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Ok(Some(content)) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Config file is malformed, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> PersistenceResult<()> {
        persistence::write_json_atomic(path, self)
    }

    /// History cap, clamped to `1..=MAX_HISTORY_LIMIT`
    pub fn history_limit(&self) -> usize {
        self.history_limit.clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn paste_delay(&self) -> Duration {
        Duration::from_millis(self.paste_delay_ms)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            heartbeat: Duration::from_secs(self.heartbeat_interval_secs.max(1)),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(self.retry_max_delay_ms.max(self.retry_base_delay_ms)),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
            refresh_on_heartbeat: self.refresh_on_heartbeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_file() {
        let config: Config = serde_json::from_str(r#"{ "hotkey": "ctrl+shift+v" }"#).unwrap();
        assert_eq!(config.hotkey.to_string(), "ctrl+shift+v");
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_bad_hotkey_keeps_other_fields() {
        let config: Config =
            serde_json::from_str(r#"{ "hotkey": "banana", "history_limit": 12 }"#).unwrap();
        assert_eq!(config.hotkey, HotkeyCombo::default());
        assert_eq!(config.history_limit, 12);
    }

    #[test]
    fn test_history_limit_is_clamped() {
        let config = Config {
            history_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.history_limit(), 1);
        let config = Config {
            history_limit: 50_000,
            ..Default::default()
        };
        assert_eq!(config.history_limit(), MAX_HISTORY_LIMIT);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::load(&path), Config::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            hotkey: "win+f9".parse().unwrap(),
            refresh_on_heartbeat: true,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""hotkey": "win+f9""#));
        assert_eq!(Config::load(&path), config);
    }

    #[test]
    fn test_supervisor_config_mapping() {
        let config = Config {
            heartbeat_interval_secs: 0,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 100,
            ..Default::default()
        };
        let sup = config.supervisor_config();
        assert_eq!(sup.heartbeat, Duration::from_secs(1));
        assert_eq!(sup.retry_max_delay, Duration::from_millis(500));
        assert_eq!(sup.max_retries, 3);
    }
}
