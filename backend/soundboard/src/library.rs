//! The sound library: the on-disk staging and output directories and the
//! command table built from them.
//!
//! Readers take a cheap `Arc` snapshot of the table. Rebuilds and upload
//! commits are serialized by a writer lock and publish a fresh table in one
//! swap, so a reader sees either the old table or the new one, never a mix.
//! Uploads download and convert outside the lock under dot-prefixed names,
//! which rebuilds skip.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use mango_commands::SoundTable;
use mango_core::{SoundError, SoundResult};
use mango_media::{FRAME_CONTAINER_EXT, FileName, Normalizer, dca, list_files};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    /// Uploads and hand-dropped files waiting for conversion.
    pub staging_dir: PathBuf,
    /// Encoded `.dca` files; the only files that become commands.
    pub output_dir: PathBuf,
}

impl Default for LibraryPaths {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("sounds/staging"),
            output_dir: PathBuf::from("sounds/dca"),
        }
    }
}

/// What one rebuild did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub registered: usize,
    /// Staged files imported into the output directory.
    pub converted: usize,
    /// Files left out, with the reason.
    pub skipped: Vec<String>,
}

/// Staged files that failed to convert, with the mtime they had then.
type FailedImports = HashMap<PathBuf, SystemTime>;

/// Files still being written by an upload.
fn is_in_flight(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

pub struct Library {
    paths: LibraryPaths,
    marker: char,
    normalizer: Arc<Normalizer>,
    table: RwLock<Arc<SoundTable>>,
    writer: Mutex<FailedImports>,
}

impl Library {
    pub fn new(paths: LibraryPaths, marker: char, normalizer: Arc<Normalizer>) -> Self {
        Self {
            paths,
            marker,
            normalizer,
            table: RwLock::new(Arc::new(SoundTable::new(marker))),
            writer: Mutex::new(FailedImports::new()),
        }
    }

    pub fn paths(&self) -> &LibraryPaths {
        &self.paths
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    /// Marker-prefixed command for a bare stem.
    pub fn command_for(&self, stem: &str) -> String {
        format!("{}{}", self.marker, stem)
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> SoundResult<()> {
        for dir in [&self.paths.staging_dir, &self.paths.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SoundError::directory(dir, e))?;
        }
        Ok(())
    }

    /// The current table.
    pub async fn snapshot(&self) -> Arc<SoundTable> {
        self.table.read().await.clone()
    }

    pub async fn lookup(&self, text: &str) -> Option<PathBuf> {
        self.table.read().await.lookup(text).map(Path::to_path_buf)
    }

    /// Whether `command` is registered or reserved.
    pub async fn is_taken(&self, command: &str) -> bool {
        let table = self.table.read().await;
        table.contains(command) || table.is_reserved(command)
    }

    /// Rebuild the table from disk and swap it in.
    ///
    /// Staged files whose stem has no encoded counterpart are imported
    /// first; one that failed to convert is not retried until it changes.
    /// A directory that cannot be read aborts the rebuild and leaves the
    /// current table in place; problems with individual files are logged
    /// and skipped.
    pub async fn rebuild(&self) -> SoundResult<RebuildReport> {
        let mut failed = self.writer.lock().await;
        self.rebuild_locked(&mut failed).await
    }

    async fn rebuild_locked(&self, failed: &mut FailedImports) -> SoundResult<RebuildReport> {
        let mut report = RebuildReport::default();

        let mut staged = list_files(&self.paths.staging_dir).await?;
        staged.retain(|p| !is_in_flight(p));
        let mut encoded = list_files(&self.paths.output_dir).await?;
        encoded.retain(|p| !is_in_flight(p));
        failed.retain(|p, _| staged.contains(p));

        let mut have: HashSet<String> = encoded
            .iter()
            .filter_map(|p| FileName::parse(p).ok())
            .filter(FileName::is_frame_container)
            .map(|n| n.stem().to_string())
            .collect();

        for file in &staged {
            let name = match FileName::parse(file) {
                Ok(name) => name,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping staged file");
                    report.skipped.push(format!("{}: {e}", file.display()));
                    continue;
                }
            };
            if have.contains(name.stem()) {
                continue;
            }
            let modified = tokio::fs::metadata(file).await.and_then(|m| m.modified()).ok();
            if modified.is_some() && failed.get(file) == modified.as_ref() {
                debug!(path = %file.display(), "Staged file failed to convert before and is unchanged");
                report
                    .skipped
                    .push(format!("{}: conversion failed earlier; replace the file to retry", file.display()));
                continue;
            }
            match self.import(file).await {
                Ok(dest) => {
                    debug!(source = %file.display(), dest = %dest.display(), "Imported staged file");
                    failed.remove(file);
                    have.insert(name.stem().to_string());
                    report.converted += 1;
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Failed to import staged file");
                    if let Some(modified) = modified {
                        failed.insert(file.clone(), modified);
                    }
                    report.skipped.push(format!("{}: {e}", file.display()));
                }
            }
        }

        if report.converted > 0 {
            encoded = list_files(&self.paths.output_dir).await?;
            encoded.retain(|p| !is_in_flight(p));
        }

        let mut table = SoundTable::new(self.marker);
        for file in encoded {
            let name = match FileName::parse(&file) {
                Ok(name) if name.is_frame_container() => name,
                Ok(_) => {
                    debug!(path = %file.display(), "Ignoring non-DCA file in output directory");
                    continue;
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping encoded file");
                    report.skipped.push(format!("{}: {e}", file.display()));
                    continue;
                }
            };
            let command = self.command_for(name.stem());
            if !table.register(&command, file.clone()) {
                warn!(command = %command, path = %file.display(), "Command already taken; skipping");
                report
                    .skipped
                    .push(format!("{}: {command} is already a command", file.display()));
            }
        }

        report.registered = table.len();
        *self.table.write().await = Arc::new(table);
        info!(
            registered = report.registered,
            converted = report.converted,
            skipped = report.skipped.len(),
            "Sound library rebuilt"
        );
        Ok(report)
    }

    /// Put `source` into the output directory as `<stem>.dca`.
    async fn import(&self, source: &Path) -> SoundResult<PathBuf> {
        let dest = Normalizer::encoded_path(source, &self.paths.output_dir)?;
        self.encode_checked(source, &dest).await?;
        Ok(dest)
    }

    /// Write a DCA rendition of `source` to `dest` and check that it
    /// decodes. DCA input is copied as-is; anything else goes through the
    /// normalizer. An output that fails to decode is removed.
    pub(crate) async fn encode_checked(&self, source: &Path, dest: &Path) -> SoundResult<()> {
        if let Some(dir) = dest.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SoundError::directory(dir, e))?;
        }
        self.normalizer.encode_into(source, dest).await?;
        if let Err(e) = dca::decode(dest).await {
            if let Err(rm) = tokio::fs::remove_file(dest).await {
                warn!(path = %dest.display(), error = %rm, "Failed to remove undecodable output");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Move an encoded upload into place as `<stem>.dca` and register it,
    /// unless the name was taken while the upload was being prepared.
    pub(crate) async fn commit(&self, prepared: &Path, stem: &str) -> SoundResult<(String, PathBuf)> {
        let _writer = self.writer.lock().await;
        let command = self.command_for(stem);
        let dest = self
            .paths
            .output_dir
            .join(format!("{stem}.{FRAME_CONTAINER_EXT}"));
        if self.is_taken(&command).await || dest.exists() {
            return Err(SoundError::DuplicateCommand(command));
        }
        tokio::fs::rename(prepared, &dest).await?;
        let key = self.insert(stem, dest.clone()).await?;
        Ok((key, dest))
    }

    /// Add one entry to the live table. Callers must hold the writer lock.
    async fn insert(&self, command: &str, path: PathBuf) -> SoundResult<String> {
        let mut current = self.table.write().await;
        let mut next = SoundTable::clone(&current);
        let key = next.try_register(command, path)?;
        *current = Arc::new(next);
        Ok(key)
    }
}
