//! Format normalizer: make sure a sound exists in DCA form.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mango_core::SoundResult;
use tracing::{debug, info};

use crate::filename::{FRAME_CONTAINER_EXT, FileName};
use crate::transcode::Transcoder;

pub struct Normalizer {
    transcoder: Arc<dyn Transcoder>,
}

impl Normalizer {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }

    /// Where the encoded copy of `path` lives under `target_dir`.
    pub fn encoded_path(path: &Path, target_dir: &Path) -> SoundResult<PathBuf> {
        let name = FileName::parse(path)?;
        Ok(target_dir.join(format!("{}.{}", name.stem(), FRAME_CONTAINER_EXT)))
    }

    /// Return `path` untouched if it is already DCA, otherwise transcode it
    /// into `target_dir/<stem>.dca` and return that path.
    pub async fn ensure_encoded(&self, path: &Path, target_dir: &Path) -> SoundResult<PathBuf> {
        let name = FileName::parse(path)?;
        if name.is_frame_container() {
            debug!(path = %path.display(), "Already DCA; no transcode needed");
            return Ok(path.to_path_buf());
        }

        let output = Self::encoded_path(path, target_dir)?;
        info!(
            input = %path.display(),
            output = %output.display(),
            transcoder = self.transcoder.name(),
            "Converting to DCA"
        );
        self.transcoder.transcode(path, &output).await?;
        Ok(output)
    }

    /// Write a DCA rendition of `path` to exactly `output`: a plain copy for
    /// DCA input, a transcode for anything else.
    pub async fn encode_into(&self, path: &Path, output: &Path) -> SoundResult<()> {
        let name = FileName::parse(path)?;
        if name.is_frame_container() {
            tokio::fs::copy(path, output).await?;
            return Ok(());
        }
        info!(
            input = %path.display(),
            output = %output.display(),
            transcoder = self.transcoder.name(),
            "Converting to DCA"
        );
        self.transcoder.transcode(path, output).await
    }
}
