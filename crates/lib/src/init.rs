//! Initialize the configuration directory: create ~/.zameen and a default config file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Create the config directory and default config file if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing; every setting then takes its default.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_dir_and_default_config() {
        let dir = std::env::temp_dir().join(format!("zameen-init-{}", uuid::Uuid::new_v4()));
        let config_path = dir.join("nested").join("config.json");
        let created = init_config_dir(&config_path).unwrap();
        assert_eq!(created, dir.join("nested"));
        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "{}");

        let (config, _) = crate::config::load_config(Some(config_path)).unwrap();
        assert_eq!(config.assistant.debounce_ms, 600);
    }

    #[test]
    fn init_keeps_existing_config() {
        let dir = std::env::temp_dir().join(format!("zameen-init-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.json");
        std::fs::write(&config_path, r#"{"assistant":{"debounceMs":250}}"#).unwrap();
        init_config_dir(&config_path).unwrap();
        let (config, _) = crate::config::load_config(Some(config_path)).unwrap();
        assert_eq!(config.assistant.debounce_ms, 250);
    }
}
