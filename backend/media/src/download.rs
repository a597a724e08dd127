//! Attachment downloader.

use std::path::Path;
use std::time::Duration;

use mango_core::{SoundError, SoundResult};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Fetches chat attachments to local disk with a size cap and a timeout.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    max_bytes: u64,
}

impl Downloader {
    pub fn new(timeout: Duration, max_bytes: u64) -> SoundResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SoundError::DownloadFailed(format!("http client: {e}")))?;
        Ok(Self::with_client(client, max_bytes))
    }

    pub fn with_client(client: Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Download `url` into `dest`, returning the number of bytes written.
    ///
    /// A partially written file is removed on failure.
    pub async fn download(&self, url: &str, dest: &Path) -> SoundResult<u64> {
        let result = self.fetch(url, dest).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(dest).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dest = %dest.display(), error = %e, "Failed to remove partial download");
                }
            }
        }
        result
    }

    async fn fetch(&self, url: &str, dest: &Path) -> SoundResult<u64> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SoundError::DownloadFailed(e.to_string()))?;

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes {
                return Err(SoundError::DownloadFailed(format!(
                    "attachment is {len} bytes, limit is {}",
                    self.max_bytes
                )));
            }
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SoundError::directory(parent, e))?;
        }
        let mut file = tokio::fs::File::create(dest).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| SoundError::DownloadFailed(e.to_string()))?
        {
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(SoundError::DownloadFailed(format!(
                    "attachment exceeds limit of {} bytes",
                    self.max_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(url = %url, dest = %dest.display(), bytes = written, "Downloaded attachment");
        Ok(written)
    }
}
