//! Recursive directory listing.

use std::path::{Path, PathBuf};

use mango_core::{SoundError, SoundResult};
use tokio::fs;
use tracing::debug;

/// List every non-directory entry under `root`, recursively, sorted.
///
/// Symlinks are reported as files and never descended into. A missing or
/// unreadable root (or subdirectory) is an error rather than an empty list.
pub async fn list_files(root: impl AsRef<Path>) -> SoundResult<Vec<PathBuf>> {
    let root = root.as_ref();
    let meta = fs::metadata(root)
        .await
        .map_err(|e| SoundError::directory(root, e))?;
    if !meta.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| SoundError::directory(&dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SoundError::directory(&dir, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SoundError::directory(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "Scanned directory");
    Ok(files)
}
