//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{
    BotConfig, DownloadConfig, LoggingConfig, MangoConfig, PathsConfig, PlaybackConfig,
    TranscoderConfig,
};

pub const DEFAULT_PREFIX: char = '!';
pub const DEFAULT_RESCAN_ON_COMMAND: bool = true;

pub const DEFAULT_STAGING_DIR: &str = "sounds/staging";
pub const DEFAULT_OUTPUT_DIR: &str = "sounds/dca";
pub const DEFAULT_SECRET_FILE: &str = "creds.pickle";

pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
pub const DEFAULT_DCA_BIN: &str = "./dca";
/// Discord voice runs at 48 kHz stereo.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_CHANNELS: u8 = 2;
pub const DEFAULT_TRANSCODE_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_LINGER_MS: u64 = 250;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;
/// Discord's own upload ceiling for unboosted guilds.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 25 * 1024 * 1024;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: MangoConfig) -> MangoConfig {
    let config = apply_bot_defaults(config);
    let config = apply_path_defaults(config);
    let config = apply_transcoder_defaults(config);
    let config = apply_playback_defaults(config);
    let config = apply_download_defaults(config);
    apply_logging_defaults(config)
}

fn apply_bot_defaults(mut config: MangoConfig) -> MangoConfig {
    let prefix = config.prefix();
    let bot = config.bot.get_or_insert_with(BotConfig::default);
    bot.prefix.get_or_insert_with(|| prefix.to_string());
    bot.status.get_or_insert_with(|| format!("{prefix}help"));
    bot.rescan_on_command.get_or_insert(DEFAULT_RESCAN_ON_COMMAND);
    config
}

fn apply_path_defaults(mut config: MangoConfig) -> MangoConfig {
    let paths = config.paths.get_or_insert_with(PathsConfig::default);
    paths
        .staging_dir
        .get_or_insert_with(|| DEFAULT_STAGING_DIR.to_string());
    paths
        .output_dir
        .get_or_insert_with(|| DEFAULT_OUTPUT_DIR.to_string());
    paths
        .secret_file
        .get_or_insert_with(|| DEFAULT_SECRET_FILE.to_string());
    config
}

fn apply_transcoder_defaults(mut config: MangoConfig) -> MangoConfig {
    let transcoder = config.transcoder.get_or_insert_with(TranscoderConfig::default);
    transcoder
        .ffmpeg
        .get_or_insert_with(|| DEFAULT_FFMPEG_BIN.to_string());
    transcoder.dca.get_or_insert_with(|| DEFAULT_DCA_BIN.to_string());
    transcoder.sample_rate.get_or_insert(DEFAULT_SAMPLE_RATE);
    transcoder.channels.get_or_insert(DEFAULT_CHANNELS);
    transcoder
        .timeout_secs
        .get_or_insert(DEFAULT_TRANSCODE_TIMEOUT_SECS);
    config
}

fn apply_playback_defaults(mut config: MangoConfig) -> MangoConfig {
    let playback = config.playback.get_or_insert_with(PlaybackConfig::default);
    playback.linger_ms.get_or_insert(DEFAULT_LINGER_MS);
    playback.send_timeout_ms.get_or_insert(DEFAULT_SEND_TIMEOUT_MS);
    config
}

fn apply_download_defaults(mut config: MangoConfig) -> MangoConfig {
    let download = config.download.get_or_insert_with(DownloadConfig::default);
    download
        .timeout_secs
        .get_or_insert(DEFAULT_DOWNLOAD_TIMEOUT_SECS);
    download.max_bytes.get_or_insert(DEFAULT_MAX_DOWNLOAD_BYTES);
    config
}

fn apply_logging_defaults(mut config: MangoConfig) -> MangoConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}
