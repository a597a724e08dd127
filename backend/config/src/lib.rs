//! `mango-config`: rocket-mango runtime configuration.
//!
//! Provides:
//! - Typed config schema with resolved accessors
//! - YAML read and atomic write
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings
//! - Redaction for safe display
//! - Bot token lookup across flag, environment, config, and secret file

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod token;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, load_raw_config, write_config};
pub use redact::redact_config;
pub use schema::MangoConfig;
pub use token::{resolve_token, MissingTokenError, ResolvedToken, TokenSource};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load, apply env substitution and defaults, and validate a config file.
///
/// Validation warnings are logged; validation errors fail the load. This is
/// the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<MangoConfig> {
    let raw = load_raw_config(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    let config: MangoConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid config at: {}", path.display()))?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!(
            "{} config error(s) in {}; first: {}",
            report.errors.len(),
            path.display(),
            report.errors[0]
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_and_prepare_rejects_invalid() {
        let dir = std::env::temp_dir().join(format!("mango-prepare-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rocket-mango.yaml");
        std::fs::write(&path, "bot:\n  prefix: \"ab\"\n").unwrap();

        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("bot.prefix"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_load_and_prepare_defaults() {
        let dir = std::env::temp_dir().join(format!("mango-prepare-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rocket-mango.yaml");
        std::fs::write(&path, "paths:\n  outputDir: clips/dca\n").unwrap();

        let config = load_and_prepare(&path).await.unwrap();
        assert_eq!(config.output_dir(), std::path::PathBuf::from("clips/dca"));
        assert_eq!(config.staging_dir(), std::path::PathBuf::from("sounds/staging"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
