//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.zameen/config.json`) and environment.
//! Covers the assistant backend endpoint, controller timings, and where chat state is persisted.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Assistant backend and controller timing settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Persistent chat state location and keys.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Assistant backend endpoint and controller timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// Base URL serving `/health` and `/chat` (default "http://127.0.0.1:8000"). Overridden by ZAMEEN_API_URL env.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Delay between health probes while the assistant is not ready (default 2000 ms).
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,

    /// Window after an accepted send during which further sends are rejected (default 600 ms).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Where the message log and visibility flag are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Storage file. Relative paths are resolved against the config file's parent. Omit to use `chat_storage.json` next to the config file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Key holding the JSON message log.
    #[serde(default = "default_history_key")]
    pub history_key: String,

    /// Key holding the panel visibility flag ("1" / "0").
    #[serde(default = "default_visibility_key")]
    pub visibility_key: String,
}

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_HISTORY_KEY: &str = "zameen_chat_history_v2";
pub const DEFAULT_VISIBILITY_KEY: &str = "zameen_chat_open_v2";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_health_interval_ms() -> u64 {
    2000
}

fn default_debounce_ms() -> u64 {
    600
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_string()
}

fn default_visibility_key() -> String {
    DEFAULT_VISIBILITY_KEY.to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_interval_ms: default_health_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl AssistantConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            history_key: default_history_key(),
            visibility_key: default_visibility_key(),
        }
    }
}

/// Resolve the assistant base URL: env ZAMEEN_API_URL overrides config. Trailing slashes are stripped.
pub fn resolve_api_base_url(config: &Config) -> String {
    let url = std::env::var("ZAMEEN_API_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.assistant.base_url.trim().to_string());
    let url = url.trim_end_matches('/');
    if url.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        url.to_string()
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ZAMEEN_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".zameen").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or ZAMEEN_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the storage file).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

fn config_parent(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve the storage file: `storage.path` if set (relative paths resolved against the config file's parent), otherwise `chat_storage.json` beside the config.
pub fn resolve_storage_path(config: &Config, config_path: &Path) -> PathBuf {
    let parent = config_parent(config_path);
    match &config.storage.path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                parent.join(p)
            }
        }
        _ => parent.join("chat_storage.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_assistant_timings() {
        let a = AssistantConfig::default();
        assert_eq!(a.base_url, "http://127.0.0.1:8000");
        assert_eq!(a.health_interval(), Duration::from_millis(2000));
        assert_eq!(a.debounce_window(), Duration::from_millis(600));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"assistant":{"baseUrl":"http://api.local:9000/"}}"#).unwrap();
        assert_eq!(config.assistant.base_url, "http://api.local:9000/");
        assert_eq!(config.assistant.debounce_ms, 600);
        assert_eq!(config.storage.history_key, "zameen_chat_history_v2");
        assert_eq!(config.storage.visibility_key, "zameen_chat_open_v2");
    }

    #[test]
    fn resolve_storage_path_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.zameen/config.json");
        assert_eq!(
            resolve_storage_path(&config, path),
            PathBuf::from("/home/user/.zameen/chat_storage.json")
        );
    }

    #[test]
    fn resolve_storage_path_override_relative() {
        let mut config = Config::default();
        config.storage.path = Some(PathBuf::from("state/chat.json"));
        let path = Path::new("/home/user/.zameen/config.json");
        assert_eq!(
            resolve_storage_path(&config, path),
            PathBuf::from("/home/user/.zameen/state/chat.json")
        );
    }

    #[test]
    fn resolve_storage_path_override_absolute() {
        let mut config = Config::default();
        config.storage.path = Some(PathBuf::from("/var/lib/zameen/chat.json"));
        let path = Path::new("/home/user/.zameen/config.json");
        assert_eq!(
            resolve_storage_path(&config, path),
            PathBuf::from("/var/lib/zameen/chat.json")
        );
    }

    #[test]
    fn load_config_missing_file_is_default() {
        let path = std::env::temp_dir()
            .join(format!("zameen-config-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.assistant.health_interval_ms, 2000);
    }

    #[test]
    fn load_config_malformed_is_error() {
        let dir = std::env::temp_dir().join(format!("zameen-config-bad-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_config(Some(path)).is_err());
    }
}
