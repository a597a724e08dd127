//! Config validation: deep schema checks with user-friendly error messages.

use crate::schema::MangoConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &MangoConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_bot(config, &mut report);
    validate_paths(config, &mut report);
    validate_transcoder(config, &mut report);
    validate_playback(config, &mut report);
    validate_download(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_bot(config: &MangoConfig, report: &mut ValidationReport) {
    let Some(bot) = &config.bot else { return };
    if let Some(prefix) = &bot.prefix {
        let mut chars = prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphanumeric() || c.is_whitespace() => {
                report.error("bot.prefix", "Prefix must be a symbol, not a letter, digit, or space")
            }
            (Some(_), None) => {}
            _ => report.error("bot.prefix", "Prefix must be exactly one character"),
        }
    }
    if bot.status.as_deref().is_some_and(|s| s.trim().is_empty()) {
        report.warn("bot.status", "Empty status; no activity will be shown");
    }
}

fn validate_paths(config: &MangoConfig, report: &mut ValidationReport) {
    if config.staging_dir() == config.output_dir() {
        report.error(
            "paths.outputDir",
            "Output directory must differ from the staging directory",
        );
    }
    if let Some(paths) = &config.paths {
        for (path, value) in [
            ("paths.stagingDir", &paths.staging_dir),
            ("paths.outputDir", &paths.output_dir),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                report.error(path, "Directory cannot be empty");
            }
        }
    }
}

fn validate_transcoder(config: &MangoConfig, report: &mut ValidationReport) {
    let Some(transcoder) = &config.transcoder else { return };
    if let Some(rate) = transcoder.sample_rate {
        if rate == 0 {
            report.error("transcoder.sampleRate", "Sample rate must be positive");
        } else if rate != 48_000 {
            report.warn(
                "transcoder.sampleRate",
                format!("Discord voice expects 48000 Hz; {rate} Hz clips will play at the wrong speed"),
            );
        }
    }
    if let Some(channels) = transcoder.channels {
        if !(1..=2).contains(&channels) {
            report.error("transcoder.channels", "Channels must be 1 or 2");
        }
    }
    if transcoder.timeout_secs == Some(0) {
        report.error("transcoder.timeoutSecs", "Timeout must be at least 1 second");
    }
    for (path, bin) in [
        ("transcoder.ffmpeg", &transcoder.ffmpeg),
        ("transcoder.dca", &transcoder.dca),
    ] {
        if bin.as_deref().is_some_and(|b| b.trim().is_empty()) {
            report.error(path, "Executable path cannot be empty");
        }
    }
}

fn validate_playback(config: &MangoConfig, report: &mut ValidationReport) {
    let Some(playback) = &config.playback else { return };
    if playback.send_timeout_ms == Some(0) {
        report.error("playback.sendTimeoutMs", "Send timeout must be positive");
    }
    if playback.linger_ms.is_some_and(|ms| ms > 5_000) {
        report.warn(
            "playback.lingerMs",
            "Linger above 5s keeps the bot in voice long after the clip ends",
        );
    }
}

fn validate_download(config: &MangoConfig, report: &mut ValidationReport) {
    let Some(download) = &config.download else { return };
    if download.max_bytes == Some(0) {
        report.error("download.maxBytes", "Size limit must be positive");
    }
    if download.timeout_secs == Some(0) {
        report.error("download.timeoutSecs", "Timeout must be at least 1 second");
    }
}

fn validate_logging(config: &MangoConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    // Full filter directives (`mango=debug,serenity=warn`) are passed through.
    if !level.contains('=') && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.warn("logging.level", format!("Unknown log level '{level}'"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{BotConfig, PathsConfig, TranscoderConfig};

    #[test]
    fn test_defaults_are_valid() {
        let report = validate(&apply_all_defaults(MangoConfig::default()));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_prefix_checks() {
        for (prefix, ok) in [("!", true), ("$", true), ("a", false), ("!!", false), ("", false)] {
            let config = MangoConfig {
                bot: Some(BotConfig {
                    prefix: Some(prefix.into()),
                    ..Default::default()
                }),
                ..Default::default()
            };
            assert_eq!(validate(&config).is_valid(), ok, "prefix {prefix:?}");
        }
    }

    #[test]
    fn test_same_staging_and_output_dir() {
        let config = MangoConfig {
            paths: Some(PathsConfig {
                staging_dir: Some("sounds".into()),
                output_dir: Some("sounds".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&config);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "paths.outputDir");
    }

    #[test]
    fn test_sample_rate_warning_and_channel_error() {
        let config = MangoConfig {
            transcoder: Some(TranscoderConfig {
                sample_rate: Some(44_100),
                channels: Some(6),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&config);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "transcoder.channels");
    }
}
