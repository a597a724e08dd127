//! Offline library commands: `list`, `inspect`, `encode`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mango_channels::UnavailableVoice;
use mango_media::{dca, FrameStats, Normalizer};
use mango_soundboard::Soundboard;

use crate::config;

pub async fn list(path: &Path) -> Result<()> {
    let cfg = config::load_with_logging(path).await?;
    let soundboard = Soundboard::new(
        config::soundboard_settings(&cfg),
        Arc::new(config::transcoder(&cfg)),
        config::downloader(&cfg)?,
        Arc::new(UnavailableVoice),
    );
    let report = soundboard.start().await?;
    let table = soundboard.library().snapshot().await;

    for (command, file) in table.iter() {
        println!("{command:<24} {}", file.display());
    }
    println!(
        "\n{} sound(s), {} converted, {} skipped",
        report.registered,
        report.converted,
        report.skipped.len()
    );
    for reason in &report.skipped {
        println!("  skipped: {reason}");
    }
    Ok(())
}

pub async fn inspect(file: &Path) -> Result<()> {
    let frames = dca::decode(file)
        .await
        .with_context(|| format!("Failed to decode {}", file.display()))?;
    let stats = FrameStats::from_frames(&frames);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn encode(path: &Path, input: &Path, out_dir: Option<&Path>) -> Result<()> {
    let cfg = config::load_with_logging(path).await?;
    let target = out_dir.map(Path::to_path_buf).unwrap_or_else(|| cfg.output_dir());
    tokio::fs::create_dir_all(&target)
        .await
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let normalizer = Normalizer::new(Arc::new(config::transcoder(&cfg)));
    let output = normalizer.ensure_encoded(input, &target).await?;
    let frames = dca::decode(&output).await?;
    let stats = FrameStats::from_frames(&frames);
    println!(
        "{} -> {} ({} frames, {} ms)",
        input.display(),
        output.display(),
        stats.frames,
        stats.duration_ms
    );
    Ok(())
}
