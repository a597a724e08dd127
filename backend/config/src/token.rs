//! Bot credential lookup.
//!
//! Checked in order: the `--token` flag, `DISCORD_TOKEN`, the legacy `TOKEN`
//! variable, `bot.token` in the config file, then the secret file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub const TOKEN_ENV_VARS: &[&str] = &["DISCORD_TOKEN", "TOKEN"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Env(&'static str),
    Config,
    SecretFile(PathBuf),
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => write!(f, "--token flag"),
            Self::Env(var) => write!(f, "${var}"),
            Self::Config => write!(f, "config bot.token"),
            Self::SecretFile(path) => write!(f, "secret file {}", path.display()),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

// Keep the secret itself out of `{:?}` output.
impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &"***")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Error)]
#[error("no bot token: pass --token, set DISCORD_TOKEN, or write it to {}", secret_file.display())]
pub struct MissingTokenError {
    pub secret_file: PathBuf,
}

/// Resolve the bot token from the process environment and disk.
pub fn resolve_token(
    flag: Option<&str>,
    config_token: Option<&str>,
    secret_file: &Path,
) -> Result<ResolvedToken, MissingTokenError> {
    resolve_token_with(flag, &std::env::vars().collect(), config_token, secret_file)
}

/// Resolve the bot token using a provided environment map.
pub fn resolve_token_with(
    flag: Option<&str>,
    env: &HashMap<String, String>,
    config_token: Option<&str>,
    secret_file: &Path,
) -> Result<ResolvedToken, MissingTokenError> {
    if let Some(token) = non_empty(flag) {
        return Ok(ResolvedToken {
            token,
            source: TokenSource::Flag,
        });
    }
    for var in TOKEN_ENV_VARS {
        if let Some(token) = non_empty(env.get(*var).map(String::as_str)) {
            return Ok(ResolvedToken {
                token,
                source: TokenSource::Env(*var),
            });
        }
    }
    if let Some(token) = non_empty(config_token) {
        return Ok(ResolvedToken {
            token,
            source: TokenSource::Config,
        });
    }
    match std::fs::read_to_string(secret_file) {
        Ok(contents) => {
            if let Some(token) = non_empty(Some(&contents)) {
                return Ok(ResolvedToken {
                    token,
                    source: TokenSource::SecretFile(secret_file.to_path_buf()),
                });
            }
            debug!(path = %secret_file.display(), "Secret file is empty");
        }
        Err(e) => debug!(path = %secret_file.display(), error = %e, "Secret file unreadable"),
    }
    Err(MissingTokenError {
        secret_file: secret_file.to_path_buf(),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
