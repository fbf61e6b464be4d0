//! The in-memory asset map.
//!
//! Every key maps to an [`AssetSlot`]. An update swaps the whole [`Asset`]
//! inside the slot, so the index alias and any route bound to the slot see
//! the new content at once and a reader never observes a half-updated asset.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::try_join_all;

use crate::assets::asset::{Asset, AssetPolicy};
use crate::assets::scan::{canonical_path, scan};

/// Shared, atomically replaceable cell holding one asset.
pub type AssetSlot = ArcSwap<Asset>;

/// Error type for store building and refreshing.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot open root directory {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compress {path}: {source}")]
    Compress {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("compression task for {path} did not complete: {source}")]
    Task {
        path: String,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("two assets map to the same path {path}")]
    Duplicate { path: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::Root { source, .. } | StoreError::Io { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Outcome of re-reading one path after a filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    Added(String),
    Updated(String),
    Removed(String),
    Skipped,
}

/// Mapping from canonical request path to asset, owned by one worker.
#[derive(Debug)]
pub struct AssetStore {
    root: PathBuf,
    index: String,
    policy: AssetPolicy,
    entries: DashMap<String, Arc<AssetSlot>>,
}

impl AssetStore {
    /// Create an empty store for an already canonical root.
    pub fn new(root: PathBuf, index: impl Into<String>, policy: AssetPolicy) -> Self {
        Self {
            root,
            index: index.into(),
            policy,
            entries: DashMap::new(),
        }
    }

    /// Scan `root`, prepare every file and index the results.
    ///
    /// All files are compressed concurrently. Any failure aborts the build.
    pub async fn build(
        root: &Path,
        index: impl Into<String>,
        policy: AssetPolicy,
    ) -> Result<Self, StoreError> {
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|source| StoreError::Root {
                path: root.to_path_buf(),
                source,
            })?;

        let files = scan(&root).await?;
        let assets = try_join_all(
            files
                .into_iter()
                .map(|file| Asset::prepare(file.path, file.content, file.modified, &policy)),
        )
        .await?;

        let store = Self::new(root, index, policy);
        for asset in assets {
            store.insert(asset)?;
        }

        tracing::info!(
            root = %store.root.display(),
            assets = store.entries.len(),
            "Asset store built"
        );
        Ok(store)
    }

    /// Add a new asset (and its index alias). Existing keys are never overwritten.
    pub fn insert(&self, asset: Asset) -> Result<(), StoreError> {
        let path = asset.path.clone();
        let alias = self.index_alias(&path);
        let slot = Arc::new(ArcSwap::from_pointee(asset));

        self.claim(path, Arc::clone(&slot))?;
        if let Some(alias) = alias {
            self.claim(alias, slot)?;
        }
        Ok(())
    }

    fn claim(&self, key: String, slot: Arc<AssetSlot>) -> Result<(), StoreError> {
        match self.entries.entry(key) {
            Entry::Occupied(existing) => Err(StoreError::Duplicate {
                path: existing.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(())
            }
        }
    }

    /// Directory key under which an index file is also served.
    ///
    /// `/docs/index.html` → `/docs/`, `/index.html` → `/`.
    pub fn index_alias(&self, path: &str) -> Option<String> {
        path.strip_suffix(self.index.as_str())
            .filter(|dir| dir.ends_with('/'))
            .map(str::to_string)
    }

    /// Current asset for an exact canonical path.
    pub fn get(&self, path: &str) -> Option<Arc<Asset>> {
        self.entries.get(path).map(|slot| slot.load_full())
    }

    /// The slot behind a path, for callers that resolve once and read many times.
    pub fn slot(&self, path: &str) -> Option<Arc<AssetSlot>> {
        self.entries.get(path).map(|slot| Arc::clone(slot.value()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of keys, aliases included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-stat and re-read `file`, then add, replace or drop its asset.
    pub async fn refresh(&self, file: &Path) -> Result<Refresh, StoreError> {
        let Some(canonical) = canonical_path(&self.root, file) else {
            return Ok(Refresh::Skipped);
        };

        let metadata = match tokio::fs::metadata(file).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.remove(&canonical)),
            Err(e) => return Err(StoreError::io(file, e)),
        };
        if !metadata.is_file() {
            return Ok(Refresh::Skipped);
        }

        let content = match tokio::fs::read(file).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.remove(&canonical)),
            Err(e) => return Err(StoreError::io(file, e)),
        };
        let modified = metadata
            .modified()
            .map_err(|source| StoreError::io(file, source))?;

        let asset = Asset::prepare(canonical.clone(), content, modified, &self.policy).await?;

        if let Some(slot) = self.slot(&canonical) {
            // Reads for close events may finish out of order; an older read
            // never replaces a newer one.
            let fresh = Arc::new(asset);
            let mut stale = false;
            slot.rcu(|current| {
                stale = current.modified > fresh.modified;
                if stale {
                    Arc::clone(current)
                } else {
                    Arc::clone(&fresh)
                }
            });
            if stale {
                return Ok(Refresh::Skipped);
            }
            return Ok(Refresh::Updated(canonical));
        }

        let alias = self.index_alias(&canonical);
        let slot = Arc::new(ArcSwap::from_pointee(asset));
        if let Some(alias) = alias {
            self.entries.insert(alias, Arc::clone(&slot));
        }
        self.entries.insert(canonical.clone(), slot);
        Ok(Refresh::Added(canonical))
    }

    /// Drop a path, its alias, and anything below it if it was a directory.
    fn remove(&self, canonical: &str) -> Refresh {
        if let Some((_, slot)) = self.entries.remove(canonical) {
            if let Some(alias) = self.index_alias(canonical) {
                self.entries
                    .remove_if(&alias, |_, aliased| Arc::ptr_eq(aliased, &slot));
            }
            return Refresh::Removed(canonical.to_string());
        }

        let prefix = format!("{canonical}/");
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        if self.entries.len() < before {
            Refresh::Removed(canonical.to_string())
        } else {
            Refresh::Skipped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use std::fs;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn policy() -> AssetPolicy {
        AssetPolicy {
            gzip: Policy::Constant(false),
            max_age: Policy::Constant(60),
        }
    }

    async fn asset(path: &str, body: &str) -> Asset {
        Asset::prepare(path.into(), body.as_bytes().to_vec(), UNIX_EPOCH, &policy())
            .await
            .unwrap()
    }

    fn body(asset: &Asset) -> &[u8] {
        asset.payload.bytes()
    }

    #[tokio::test]
    async fn index_is_aliased_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("docs/index.html"), "docs").unwrap();

        let store = AssetStore::build(dir.path(), "index.html", policy())
            .await
            .unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(body(&store.get("/").unwrap()), b"home");
        let direct = store.slot("/docs/index.html").unwrap();
        let alias = store.slot("/docs/").unwrap();
        assert!(Arc::ptr_eq(&direct, &alias));
        assert!(store.get("/docs").is_none());
    }

    #[tokio::test]
    async fn duplicate_paths_are_rejected() {
        let store = AssetStore::new(PathBuf::from("/srv"), "index.html", policy());
        store.insert(asset("/a.txt", "one").await).unwrap();

        let err = store.insert(asset("/a.txt", "two").await).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref path } if path == "/a.txt"));
        assert_eq!(body(&store.get("/a.txt").unwrap()), b"one");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn lossy_file_names_collide_at_build() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"a\xff")), "1").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"a\xfe")), "2").unwrap();

        let err = AssetStore::build(dir.path(), "index.html", policy())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn refresh_updates_adds_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "old").unwrap();
        let store = AssetStore::build(dir.path(), "index.html", policy())
            .await
            .unwrap();
        let root = store.root().to_path_buf();

        fs::write(root.join("a.txt"), "new").unwrap();
        assert_eq!(
            store.refresh(&root.join("a.txt")).await.unwrap(),
            Refresh::Updated("/a.txt".into())
        );
        assert_eq!(body(&store.get("/a.txt").unwrap()), b"new");

        fs::write(root.join("b.txt"), "bee").unwrap();
        assert_eq!(
            store.refresh(&root.join("b.txt")).await.unwrap(),
            Refresh::Added("/b.txt".into())
        );

        fs::remove_file(root.join("a.txt")).unwrap();
        assert_eq!(
            store.refresh(&root.join("a.txt")).await.unwrap(),
            Refresh::Removed("/a.txt".into())
        );
        assert!(store.get("/a.txt").is_none());
        assert!(store.get("/b.txt").is_some());
    }

    #[tokio::test]
    async fn late_read_of_older_content_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "current").unwrap();
        let store = AssetStore::build(dir.path(), "index.html", policy())
            .await
            .unwrap();
        let file = store.root().join("a.txt");

        let set_mtime = |when: SystemTime| {
            fs::File::options()
                .write(true)
                .open(&file)
                .unwrap()
                .set_modified(when)
                .unwrap();
        };

        fs::write(&file, "older").unwrap();
        set_mtime(UNIX_EPOCH + Duration::from_secs(1_000));
        assert_eq!(store.refresh(&file).await.unwrap(), Refresh::Skipped);
        assert_eq!(body(&store.get("/a.txt").unwrap()), b"current");

        set_mtime(SystemTime::now() + Duration::from_secs(60));
        assert_eq!(
            store.refresh(&file).await.unwrap(),
            Refresh::Updated("/a.txt".into())
        );
        assert_eq!(body(&store.get("/a.txt").unwrap()), b"older");
    }

    #[tokio::test]
    async fn refreshing_index_updates_alias() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "v1").unwrap();
        let store = AssetStore::build(dir.path(), "index.html", policy())
            .await
            .unwrap();
        let root = store.root().to_path_buf();

        fs::write(root.join("docs/index.html"), "v2").unwrap();
        store.refresh(&root.join("docs/index.html")).await.unwrap();
        assert_eq!(body(&store.get("/docs/").unwrap()), b"v2");

        fs::remove_dir_all(root.join("docs")).unwrap();
        assert_eq!(
            store.refresh(&root.join("docs")).await.unwrap(),
            Refresh::Removed("/docs".into())
        );
        assert!(store.get("/docs/").is_none());
        assert!(store.get("/docs/index.html").is_none());
    }

    #[tokio::test]
    async fn directories_and_outside_paths_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let store = AssetStore::build(dir.path(), "index.html", policy())
            .await
            .unwrap();
        let root = store.root().to_path_buf();

        assert_eq!(store.refresh(&root.join("sub")).await.unwrap(), Refresh::Skipped);
        assert_eq!(
            store.refresh(Path::new("/definitely/elsewhere")).await.unwrap(),
            Refresh::Skipped
        );
        assert!(store.is_empty());
    }
}
