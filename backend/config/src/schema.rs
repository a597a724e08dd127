//! Typed config schema.
//!
//! Every field is optional on disk; [`crate::defaults::apply_all_defaults`]
//! fills the gaps and the accessors on [`MangoConfig`] fall back to the same
//! defaults, so callers never see a `None`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<PathsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcoder: Option<TranscoderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback: Option<PlaybackConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Bot token; usually `${DISCORD_TOKEN}`. The `--token` flag and the
    /// environment take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Single-character command marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Activity text shown once connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Rebuild the library from disk before serving each command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescan_on_command: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_file: Option<String>,
    /// Rolling NDJSON logs; omit for console only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscoderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linger_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// JSON console output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl MangoConfig {
    pub fn token(&self) -> Option<&str> {
        self.bot.as_ref()?.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Command marker. Falls back to `!` when unset or not a single char.
    pub fn prefix(&self) -> char {
        let configured = self.bot.as_ref().and_then(|b| b.prefix.as_deref());
        match configured.map(|p| {
            let mut chars = p.chars();
            (chars.next(), chars.next())
        }) {
            Some((Some(c), None)) => c,
            _ => DEFAULT_PREFIX,
        }
    }

    pub fn status(&self) -> String {
        self.bot
            .as_ref()
            .and_then(|b| b.status.clone())
            .unwrap_or_else(|| format!("{}help", self.prefix()))
    }

    pub fn rescan_on_command(&self) -> bool {
        self.bot
            .as_ref()
            .and_then(|b| b.rescan_on_command)
            .unwrap_or(DEFAULT_RESCAN_ON_COMMAND)
    }

    pub fn staging_dir(&self) -> PathBuf {
        PathBuf::from(
            self.paths
                .as_ref()
                .and_then(|p| p.staging_dir.as_deref())
                .unwrap_or(DEFAULT_STAGING_DIR),
        )
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(
            self.paths
                .as_ref()
                .and_then(|p| p.output_dir.as_deref())
                .unwrap_or(DEFAULT_OUTPUT_DIR),
        )
    }

    pub fn secret_file(&self) -> PathBuf {
        PathBuf::from(
            self.paths
                .as_ref()
                .and_then(|p| p.secret_file.as_deref())
                .unwrap_or(DEFAULT_SECRET_FILE),
        )
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.paths
            .as_ref()
            .and_then(|p| p.log_dir.as_deref())
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn ffmpeg_bin(&self) -> String {
        self.transcoder
            .as_ref()
            .and_then(|t| t.ffmpeg.clone())
            .unwrap_or_else(|| DEFAULT_FFMPEG_BIN.to_string())
    }

    pub fn dca_bin(&self) -> String {
        self.transcoder
            .as_ref()
            .and_then(|t| t.dca.clone())
            .unwrap_or_else(|| DEFAULT_DCA_BIN.to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.transcoder
            .as_ref()
            .and_then(|t| t.sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn channels(&self) -> u8 {
        self.transcoder
            .as_ref()
            .and_then(|t| t.channels)
            .unwrap_or(DEFAULT_CHANNELS)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(
            self.transcoder
                .as_ref()
                .and_then(|t| t.timeout_secs)
                .unwrap_or(DEFAULT_TRANSCODE_TIMEOUT_SECS),
        )
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(
            self.playback
                .as_ref()
                .and_then(|p| p.linger_ms)
                .unwrap_or(DEFAULT_LINGER_MS),
        )
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(
            self.playback
                .as_ref()
                .and_then(|p| p.send_timeout_ms)
                .unwrap_or(DEFAULT_SEND_TIMEOUT_MS),
        )
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(
            self.download
                .as_ref()
                .and_then(|d| d.timeout_secs)
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        )
    }

    pub fn max_download_bytes(&self) -> u64 {
        self.download
            .as_ref()
            .and_then(|d| d.max_bytes)
            .unwrap_or(DEFAULT_MAX_DOWNLOAD_BYTES)
    }

    pub fn log_level(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MangoConfig::default();
        assert_eq!(config.prefix(), '!');
        assert_eq!(config.status(), "!help");
        assert_eq!(config.staging_dir(), PathBuf::from("sounds/staging"));
        assert_eq!(config.output_dir(), PathBuf::from("sounds/dca"));
        assert_eq!(config.secret_file(), PathBuf::from("creds.pickle"));
        assert_eq!(config.linger(), Duration::from_millis(250));
        assert_eq!(config.log_dir(), None);
        assert_eq!(config.token(), None);
    }

    #[test]
    fn test_camel_case_yaml() {
        let yaml = r#"
bot:
  prefix: "$"
paths:
  stagingDir: /srv/mango/in
  outputDir: /srv/mango/dca
transcoder:
  sampleRate: 48000
  timeoutSecs: 30
playback:
  lingerMs: 100
"#;
        let config: MangoConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.prefix(), '$');
        assert_eq!(config.status(), "$help");
        assert_eq!(config.staging_dir(), PathBuf::from("/srv/mango/in"));
        assert_eq!(config.transcode_timeout(), Duration::from_secs(30));
        assert_eq!(config.linger(), Duration::from_millis(100));
    }

    #[test]
    fn test_multi_char_prefix_falls_back() {
        let config = MangoConfig {
            bot: Some(BotConfig {
                prefix: Some("!!".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.prefix(), '!');
    }
}
