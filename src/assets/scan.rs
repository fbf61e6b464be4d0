//! Recursive directory scan.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::assets::store::StoreError;

/// A regular file read fully into memory.
#[derive(Debug)]
pub struct ScannedFile {
    pub path: String,
    pub content: Vec<u8>,
    pub modified: SystemTime,
}

/// Canonical request path for `file` under `root`.
///
/// Returns `None` when `file` is not inside `root` or is `root` itself.
pub fn canonical_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut canonical = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                canonical.push('/');
                canonical.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!canonical.is_empty()).then_some(canonical)
}

/// Walk `root` and read every regular file below it.
///
/// Symlinks are followed. Any read or stat failure aborts the scan.
pub async fn scan(root: &Path) -> Result<Vec<ScannedFile>, StoreError> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|source| StoreError::io(&dir, source))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::io(&dir, source))?
        {
            let path = entry.path();
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|source| StoreError::io(&path, source))?;

            if metadata.is_dir() {
                pending.push(path);
                continue;
            }
            if !metadata.is_file() {
                continue;
            }

            let Some(canonical) = canonical_path(root, &path) else {
                continue;
            };
            let content = tokio::fs::read(&path)
                .await
                .map_err(|source| StoreError::io(&path, source))?;
            let modified = metadata
                .modified()
                .map_err(|source| StoreError::io(&path, source))?;

            files.push(ScannedFile {
                path: canonical,
                content,
                modified,
            });
        }
    }

    tracing::debug!(root = %root.display(), files = files.len(), "Scan complete");
    Ok(files)
}
