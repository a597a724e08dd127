//! Config file location, read, and atomic write.

use crate::schema::MangoConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Config file looked for in the working directory.
pub const CONFIG_FILE_NAME: &str = "rocket-mango.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MANGO_CONFIG";

/// Per-user config directory (`~/.config/rocket-mango` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rocket-mango"))
}

/// Resolve the config file path.
/// Priority: explicit flag > `MANGO_CONFIG` env > `./rocket-mango.yaml` >
/// `<config_dir>/config.yaml` if that exists.
pub fn config_file_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    match config_dir().map(|d| d.join("config.yaml")) {
        Some(user) if user.exists() => user,
        _ => local,
    }
}

/// Read the config as an untyped tree, before env substitution.
///
/// Returns an empty object if the file doesn't exist (first run).
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    // An empty file parses to null.
    Ok(if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    })
}

/// Load and parse the config from disk without env substitution.
pub async fn load_config(path: &Path) -> Result<MangoConfig> {
    let value = load_raw_config(path).await?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config at: {}", path.display()))
}

/// Write config to disk atomically (write to temp file, rename).
pub async fn write_config(config: &MangoConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path).await.with_context(|| {
        format!("Failed to rename temp config to: {}", path.display())
    })?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("mango-config-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let path = scratch_dir().join("absent.yaml");
        let config = load_config(&path).await.unwrap();
        assert_eq!(config, MangoConfig::default());
    }

    #[tokio::test]
    async fn test_empty_file_is_default() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.yaml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(load_config(&path).await.unwrap(), MangoConfig::default());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = scratch_dir();
        let path = dir.join("nested").join("rocket-mango.yaml");
        let config = apply_all_defaults(MangoConfig::default());

        write_config(&config, &path).await.unwrap();
        assert!(!path.with_extension("yaml.tmp").exists());
        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded, config);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("stagingDir"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_bad_yaml_is_an_error() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        std::fs::write(&path, "bot: [unclosed").unwrap();
        assert!(load_config(&path).await.is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_explicit_flag_wins() {
        let path = config_file_path(Some(Path::new("/etc/mango.yaml")));
        assert_eq!(path, PathBuf::from("/etc/mango.yaml"));
    }
}
