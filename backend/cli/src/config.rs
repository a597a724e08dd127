//! Turning the config file into runtime settings.

use std::path::Path;

use anyhow::{bail, Result};
use mango_config::{validate, MangoConfig};
use mango_logging::LogOptions;
use mango_media::{Downloader, FfmpegDcaTranscoder, PipelineConfig};
use mango_player::PlayerConfig;
use mango_soundboard::{LibraryPaths, SoundboardSettings};
use tracing::warn;

/// Load the config and start logging as it asks.
///
/// Validation warnings are re-emitted once the logger exists.
pub async fn load_with_logging(path: &Path) -> Result<MangoConfig> {
    let config = mango_config::load_and_prepare(path).await?;
    mango_logging::init_logger(&log_options(&config));
    for warning in validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    Ok(config)
}

pub fn log_options(config: &MangoConfig) -> LogOptions {
    LogOptions {
        level: config.log_level(),
        json: config.log_json(),
        log_dir: config.log_dir(),
    }
}

pub fn pipeline_config(config: &MangoConfig) -> PipelineConfig {
    PipelineConfig {
        ffmpeg_bin: config.ffmpeg_bin(),
        dca_bin: config.dca_bin(),
        sample_rate: config.sample_rate(),
        channels: config.channels(),
        timeout: config.transcode_timeout(),
    }
}

pub fn transcoder(config: &MangoConfig) -> FfmpegDcaTranscoder {
    FfmpegDcaTranscoder::new(pipeline_config(config))
}

pub fn downloader(config: &MangoConfig) -> Result<Downloader> {
    Ok(Downloader::new(config.download_timeout(), config.max_download_bytes())?)
}

pub fn soundboard_settings(config: &MangoConfig) -> SoundboardSettings {
    SoundboardSettings {
        marker: config.prefix(),
        paths: LibraryPaths {
            staging_dir: config.staging_dir(),
            output_dir: config.output_dir(),
        },
        rescan_on_command: config.rescan_on_command(),
        player: PlayerConfig {
            linger: config.linger(),
            send_timeout: config.send_timeout(),
        },
    }
}

/// `rocket-mango init`: write every default out so there is something to edit.
pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let config = mango_config::apply_all_defaults(MangoConfig::default());
    mango_config::write_config(&config, path).await?;
    println!("Wrote {}", path.display());
    println!("Set DISCORD_TOKEN (or bot.token) before running `rocket-mango run`.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn settings_follow_config() {
        let config: MangoConfig = serde_json::from_value(serde_json::json!({
            "bot": { "prefix": "$", "rescanOnCommand": false },
            "paths": { "stagingDir": "in", "outputDir": "out" },
            "playback": { "lingerMs": 100 }
        }))
        .unwrap();

        let settings = soundboard_settings(&config);
        assert_eq!(settings.marker, '$');
        assert!(!settings.rescan_on_command);
        assert_eq!(settings.paths.output_dir, Path::new("out"));
        assert_eq!(settings.player.linger, Duration::from_millis(100));
    }

    #[test]
    fn pipeline_defaults() {
        let pipeline = pipeline_config(&MangoConfig::default());
        assert_eq!(pipeline.ffmpeg_bin, "ffmpeg");
        assert_eq!(pipeline.sample_rate, 48_000);
        assert_eq!(pipeline.channels, 2);
    }

    #[tokio::test]
    async fn init_refuses_to_clobber() {
        let dir = std::env::temp_dir().join(format!("mango-cli-{}", uuid::Uuid::new_v4()));
        let path = dir.join("rocket-mango.yaml");

        init(&path, false).await.unwrap();
        assert!(init(&path, false).await.is_err());
        init(&path, true).await.unwrap();

        let loaded = mango_config::load_config(&path).await.unwrap();
        assert_eq!(loaded.prefix(), '!');
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
