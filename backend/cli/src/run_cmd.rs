use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mango_channels::{ChannelAdapter, DiscordAdapter, VoiceBackend};
use mango_logging::mask_secret;
use mango_soundboard::Soundboard;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config;

/// `rocket-mango run`: load the library and serve Discord until Ctrl-C.
pub async fn run(path: &Path, token_flag: Option<&str>) -> Result<()> {
    let cfg = config::load_with_logging(path).await?;
    let token = mango_config::resolve_token(token_flag, cfg.token(), &cfg.secret_file())?;
    info!(
        source = %token.source,
        token = %mask_secret(&token.token),
        prefix = %cfg.prefix(),
        "Starting rocket-mango"
    );

    let voice = VoiceBackend::new();
    if !voice.is_available() {
        warn!("Built without a voice transport; sounds will be listed but not played");
    }

    let soundboard = Arc::new(Soundboard::new(
        config::soundboard_settings(&cfg),
        Arc::new(config::transcoder(&cfg)),
        config::downloader(&cfg)?,
        voice.gateway(),
    ));
    let report = soundboard
        .start()
        .await
        .context("Failed to load the sound library")?;
    info!(
        sounds = report.registered,
        converted = report.converted,
        skipped = report.skipped.len(),
        "Sound library ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    let adapter = DiscordAdapter::new(token.token, cfg.status(), soundboard, &voice);
    info!(adapter = adapter.name(), "Registered channel adapter");
    adapter.start(shutdown_rx).await
}
