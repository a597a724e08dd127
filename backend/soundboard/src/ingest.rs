//! Attachment ingest: download → convert into the output directory →
//! register, with the staged copy removed afterwards.
//!
//! Download and conversion work on dot-prefixed scratch names and take no
//! lock, so commands keep flowing while an upload is in progress. Only the
//! final rename and registration run under the library's writer lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mango_commands::Attachment;
use mango_core::{SoundError, SoundResult};
use mango_media::{Downloader, FRAME_CONTAINER_EXT, FileName, Normalizer, is_ingestible};
use serde::Serialize;
use tracing::{info, warn};

use crate::library::Library;

/// A sound added from an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub command: String,
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct Ingestor {
    library: Arc<Library>,
    downloader: Downloader,
    /// Keeps scratch names of concurrent uploads apart.
    next_id: AtomicU64,
}

impl Ingestor {
    pub fn new(library: Arc<Library>, downloader: Downloader) -> Self {
        Self {
            library,
            downloader,
            next_id: AtomicU64::new(0),
        }
    }

    /// Turn one attachment into a playable command.
    ///
    /// Cheap checks (name, type, reported size, duplicates) run before any
    /// download. On failure the table is left unchanged.
    pub async fn ingest(&self, attachment: &Attachment) -> SoundResult<IngestOutcome> {
        // Only the final component: uploads never choose their own directory.
        let file_name = Path::new(&attachment.filename)
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| SoundError::InvalidFilename(attachment.filename.clone()))?;
        let name = FileName::parse(&file_name)?;
        let command = self.library.command_for(name.stem());

        if !is_ingestible(&file_name) {
            return Err(SoundError::InvalidFilename(format!(
                "{}: not an audio file",
                attachment.filename
            )));
        }
        if attachment.size > self.downloader.max_bytes() {
            return Err(SoundError::DownloadFailed(format!(
                "{} is {} bytes, limit is {}",
                attachment.filename,
                attachment.size,
                self.downloader.max_bytes()
            )));
        }

        // Checked again at commit; this one just saves a pointless download.
        let paths = self.library.paths();
        let encoded = Normalizer::encoded_path(&file_name, &paths.output_dir)?;
        if self.library.is_taken(&command).await || encoded.exists() {
            return Err(SoundError::DuplicateCommand(command));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let staged = paths
            .staging_dir
            .join(format!(".{id}.{}", file_name.display()));
        let prepared = paths
            .output_dir
            .join(format!(".{id}.{}.{FRAME_CONTAINER_EXT}", name.stem()));
        let result = self
            .stage_and_commit(attachment, &staged, &prepared, name.stem())
            .await;

        for scratch in [&staged, &prepared] {
            if let Err(e) = tokio::fs::remove_file(scratch).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %scratch.display(), error = %e, "Failed to remove upload scratch file");
                }
            }
        }
        result
    }

    async fn stage_and_commit(
        &self,
        attachment: &Attachment,
        staged: &Path,
        prepared: &Path,
        stem: &str,
    ) -> SoundResult<IngestOutcome> {
        let bytes = self.downloader.download(&attachment.url, staged).await?;
        self.library.encode_checked(staged, prepared).await?;
        let (command, path) = self.library.commit(prepared, stem).await?;
        info!(command = %command, path = %path.display(), bytes, "Added sound");
        Ok(IngestOutcome {
            command,
            path,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryPaths;
    use crate::testing::{FakeTranscoder, dca_bytes, local_downloader, scratch_dir, serve_once, serve_stalled};
    use std::time::Duration;

    fn setup(root: &Path) -> (Arc<Library>, Arc<FakeTranscoder>) {
        let transcoder = Arc::new(FakeTranscoder::default());
        let library = Arc::new(Library::new(
            LibraryPaths {
                staging_dir: root.join("staging"),
                output_dir: root.join("dca"),
            },
            '!',
            Arc::new(Normalizer::new(transcoder.clone())),
        ));
        (library, transcoder)
    }

    /// Staging is empty and no half-made output is left behind.
    fn assert_no_scratch(root: &Path) {
        assert_eq!(std::fs::read_dir(root.join("staging")).unwrap().count(), 0);
        let leftovers: Vec<_> = std::fs::read_dir(root.join("dca"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "scratch files left: {leftovers:?}");
    }

    fn attachment(filename: &str, url: &str, size: u64) -> Attachment {
        Attachment {
            filename: filename.into(),
            url: url.into(),
            size,
        }
    }

    #[tokio::test]
    async fn uploads_are_converted_registered_and_unstaged() {
        let root = scratch_dir();
        let (library, transcoder) = setup(&root);
        library.ensure_dirs().await.unwrap();
        let ingestor = Ingestor::new(library.clone(), local_downloader(1024));

        let url = serve_once("200 OK", b"ID3 fake".to_vec()).await;
        let outcome = ingestor.ingest(&attachment("moo.mp3", &url, 8)).await.unwrap();

        assert_eq!(outcome.command, "!moo");
        assert_eq!(outcome.path, root.join("dca/moo.dca"));
        assert_eq!(outcome.bytes, 8);
        assert_eq!(transcoder.calls(), 1);
        assert_eq!(library.lookup("!moo").await, Some(root.join("dca/moo.dca")));
        assert_no_scratch(&root);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn dca_upload_is_validated_and_copied() {
        let root = scratch_dir();
        let (library, transcoder) = setup(&root);
        library.ensure_dirs().await.unwrap();
        let ingestor = Ingestor::new(library.clone(), local_downloader(1024));

        let url = serve_once("200 OK", dca_bytes(2)).await;
        let outcome = ingestor.ingest(&attachment("zap.dca", &url, 0)).await.unwrap();
        assert_eq!(outcome.command, "!zap");
        assert_eq!(transcoder.calls(), 0);
        assert_eq!(std::fs::read(root.join("dca/zap.dca")).unwrap(), dca_bytes(2));
        assert_no_scratch(&root);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn corrupt_dca_upload_leaves_table_alone() {
        let root = scratch_dir();
        let (library, _) = setup(&root);
        library.ensure_dirs().await.unwrap();
        let ingestor = Ingestor::new(library.clone(), local_downloader(1024));

        let url = serve_once("200 OK", vec![0x10, 0x00, 0x01]).await;
        let err = ingestor.ingest(&attachment("bad.dca", &url, 3)).await.unwrap_err();
        assert!(err.is_framing());
        assert!(library.snapshot().await.is_empty());
        assert!(!root.join("dca/bad.dca").exists());
        assert_no_scratch(&root);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn failed_conversion_leaves_table_and_dirs_clean() {
        let root = scratch_dir();
        let transcoder = Arc::new(FakeTranscoder::failing());
        let library = Arc::new(Library::new(
            LibraryPaths {
                staging_dir: root.join("staging"),
                output_dir: root.join("dca"),
            },
            '!',
            Arc::new(Normalizer::new(transcoder.clone())),
        ));
        library.ensure_dirs().await.unwrap();
        let ingestor = Ingestor::new(library.clone(), local_downloader(1024));

        let url = serve_once("200 OK", b"RIFF junk".to_vec()).await;
        let err = ingestor.ingest(&attachment("moo.wav", &url, 9)).await.unwrap_err();
        assert!(matches!(err, SoundError::TranscodeFailed(_)));
        assert_eq!(transcoder.calls(), 1);
        assert!(library.snapshot().await.is_empty());
        assert!(!root.join("dca/moo.dca").exists());
        assert_no_scratch(&root);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn slow_download_does_not_hold_up_rebuilds() {
        let root = scratch_dir();
        let (library, _) = setup(&root);
        library.ensure_dirs().await.unwrap();
        std::fs::write(root.join("dca/airhorn.dca"), dca_bytes(1)).unwrap();
        let ingestor = Arc::new(Ingestor::new(library.clone(), local_downloader(1024)));

        let url = serve_stalled(Duration::from_secs(3)).await;
        let upload = {
            let ingestor = ingestor.clone();
            tokio::spawn(async move { ingestor.ingest(&attachment("moo.mp3", &url, 8)).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;

        let report = tokio::time::timeout(Duration::from_millis(500), library.rebuild())
            .await
            .expect("rebuild waited on the upload")
            .unwrap();
        assert_eq!(report.registered, 1);
        assert_eq!(report.converted, 0);

        upload.abort();
        let _ = upload.await;
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn duplicate_is_rejected_before_download() {
        let root = scratch_dir();
        let (library, _) = setup(&root);
        library.ensure_dirs().await.unwrap();
        std::fs::write(root.join("dca/airhorn.dca"), dca_bytes(1)).unwrap();
        library.rebuild().await.unwrap();
        let ingestor = Ingestor::new(library.clone(), local_downloader(1024));

        // Nothing is listening here; a download attempt would fail differently.
        let err = ingestor
            .ingest(&attachment("airhorn.ogg", "http://127.0.0.1:9/x", 10))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "!airhorn is already a command");
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn reserved_names_and_bad_types_are_refused() {
        let root = scratch_dir();
        let (library, _) = setup(&root);
        let ingestor = Ingestor::new(library, local_downloader(1024));

        let err = ingestor
            .ingest(&attachment("help.mp3", "http://127.0.0.1:9/x", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, SoundError::DuplicateCommand(ref c) if c == "!help"));

        let err = ingestor
            .ingest(&attachment("notes.txt", "http://127.0.0.1:9/x", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, SoundError::InvalidFilename(_)));

        let err = ingestor
            .ingest(&attachment("huge.wav", "http://127.0.0.1:9/x", 4096))
            .await
            .unwrap_err();
        assert!(matches!(err, SoundError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn path_components_in_filename_are_dropped() {
        let root = scratch_dir();
        let (library, _) = setup(&root);
        library.ensure_dirs().await.unwrap();
        let ingestor = Ingestor::new(library.clone(), local_downloader(1024));

        let url = serve_once("200 OK", b"OggS".to_vec()).await;
        let outcome = ingestor
            .ingest(&attachment("../../etc/boop.ogg", &url, 4))
            .await
            .unwrap();
        assert_eq!(outcome.command, "!boop");
        assert_eq!(outcome.path, root.join("dca/boop.dca"));
        std::fs::remove_dir_all(&root).unwrap();
    }
}
