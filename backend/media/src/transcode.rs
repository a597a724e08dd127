//! External transcoding pipeline: `ffmpeg` decodes to raw PCM, `dca` packages
//! it into Opus frames.
//!
//! Both processes are spawned directly (no shell), wired together with async
//! copies, and killed if the pipeline times out or the caller goes away.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use mango_core::{SoundError, SoundResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Converts an arbitrary audio file into a DCA file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Encode `input` into a DCA file at `output`, replacing it if present.
    async fn transcode(&self, input: &Path, output: &Path) -> SoundResult<()>;
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Audio decoder executable
    pub ffmpeg_bin: String,
    /// Opus frame packager executable
    pub dca_bin: String,
    pub sample_rate: u32,
    pub channels: u8,
    /// Wall-clock budget for the whole pipeline
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            dca_bin: "./dca".to_string(),
            sample_rate: 48_000,
            channels: 2,
            timeout: Duration::from_secs(120),
        }
    }
}

/// `ffmpeg -i <in> -f s16le -ar <rate> -ac <ch> pipe:1 | dca > <out>`
pub struct FfmpegDcaTranscoder {
    config: PipelineConfig,
}

impl FfmpegDcaTranscoder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn spawn_decoder(&self, input: &Path) -> SoundResult<Child> {
        Command::new(&self.config.ffmpeg_bin)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(input)
            .args(["-f", "s16le", "-ar"])
            .arg(self.config.sample_rate.to_string())
            .arg("-ac")
            .arg(self.config.channels.to_string())
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed(format!("failed to spawn {}: {e}", self.config.ffmpeg_bin)))
    }

    fn spawn_packager(&self) -> SoundResult<Child> {
        Command::new(&self.config.dca_bin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed(format!("failed to spawn {}: {e}", self.config.dca_bin)))
    }

    async fn run_pipeline(&self, input: &Path, output: &Path) -> SoundResult<()> {
        let mut decoder = self.spawn_decoder(input)?;
        let mut packager = self.spawn_packager()?;

        let mut pcm = decoder.stdout.take().ok_or_else(|| failed("decoder stdout unavailable"))?;
        let decoder_err = decoder.stderr.take().ok_or_else(|| failed("decoder stderr unavailable"))?;
        let mut packager_in = packager.stdin.take().ok_or_else(|| failed("packager stdin unavailable"))?;
        let mut packager_out = packager.stdout.take().ok_or_else(|| failed("packager stdout unavailable"))?;
        let packager_err = packager.stderr.take().ok_or_else(|| failed("packager stderr unavailable"))?;

        let mut out_file = tokio::fs::File::create(output)
            .await
            .map_err(|e| failed(format!("cannot create {}: {e}", output.display())))?;

        let feed = async move {
            let n = tokio::io::copy(&mut pcm, &mut packager_in).await?;
            // Closing stdin lets the packager flush and exit.
            packager_in.shutdown().await?;
            Ok::<u64, std::io::Error>(n)
        };
        let drain = async move {
            let n = tokio::io::copy(&mut packager_out, &mut out_file).await?;
            out_file.flush().await?;
            Ok::<u64, std::io::Error>(n)
        };

        let (pcm_bytes, dca_bytes, decoder_log, packager_log) = tokio::try_join!(
            feed,
            drain,
            read_to_string(decoder_err),
            read_to_string(packager_err),
        )
        .map_err(|e| failed(format!("pipeline i/o: {e}")))?;

        let decoder_status = decoder.wait().await.map_err(|e| failed(e.to_string()))?;
        let packager_status = packager.wait().await.map_err(|e| failed(e.to_string()))?;

        check_status(&self.config.ffmpeg_bin, decoder_status, &decoder_log)?;
        check_status(&self.config.dca_bin, packager_status, &packager_log)?;

        if dca_bytes == 0 {
            return Err(failed(format!(
                "packager produced no output from {pcm_bytes} bytes of PCM"
            )));
        }

        info!(
            input = %input.display(),
            output = %output.display(),
            pcm_bytes,
            dca_bytes,
            "Transcoded to DCA"
        );
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegDcaTranscoder {
    fn name(&self) -> &str {
        "ffmpeg|dca"
    }

    async fn transcode(&self, input: &Path, output: &Path) -> SoundResult<()> {
        if !input.is_file() {
            return Err(failed(format!("input {} does not exist", input.display())));
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SoundError::directory(parent, e))?;
        }

        let result = tokio::time::timeout(self.config.timeout, self.run_pipeline(input, output)).await;
        let result = match result {
            Ok(inner) => inner,
            Err(_) => Err(failed(format!(
                "timed out after {}s",
                self.config.timeout.as_secs()
            ))),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(output).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(output = %output.display(), error = %e, "Failed to remove partial output");
                }
            }
        }
        result
    }
}

fn failed(message: impl Into<String>) -> SoundError {
    SoundError::TranscodeFailed(message.into())
}

fn check_status(bin: &str, status: ExitStatus, log: &str) -> SoundResult<()> {
    if status.success() {
        return Ok(());
    }
    let log = log.trim();
    let tail = log
        .char_indices()
        .rev()
        .nth(399)
        .map(|(i, _)| &log[i..])
        .unwrap_or(log);
    Err(failed(format!("{bin} exited with {status}: {tail}")))
}

async fn read_to_string<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_input_fails_without_spawning() {
        let transcoder = FfmpegDcaTranscoder::new(PipelineConfig {
            ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
            ..Default::default()
        });
        let input = std::env::temp_dir().join(format!("mango-missing-{}.mp3", uuid::Uuid::new_v4()));
        let output = std::env::temp_dir().join(format!("mango-out-{}.dca", uuid::Uuid::new_v4()));
        let err = transcoder.transcode(&input, &output).await.unwrap_err();
        assert!(matches!(err, SoundError::TranscodeFailed(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn missing_binary_is_transcode_failure() {
        let dir = std::env::temp_dir().join(format!("mango-transcode-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("clip.mp3");
        std::fs::write(&input, b"not really audio").unwrap();

        let transcoder = FfmpegDcaTranscoder::new(PipelineConfig {
            ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
            ..Default::default()
        });
        let err = transcoder.transcode(&input, &dir.join("clip.dca")).await.unwrap_err();
        match err {
            SoundError::TranscodeFailed(msg) => assert!(msg.contains("failed to spawn")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.join("clip.dca").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn default_pipeline_targets_discord_pcm() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.channels, 2);
    }
}
