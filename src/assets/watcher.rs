//! Filesystem watcher keeping an [`AssetStore`] in sync with disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::assets::store::{AssetStore, Refresh};
use crate::observability::metrics;

/// Delay between a change notification and re-reading the path.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

/// A watcher that re-reads changed files into the store.
pub struct AssetWatcher {
    root: PathBuf,
    debounce: Duration,
}

impl AssetWatcher {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            debounce: DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called from within the worker's runtime.
    ///
    /// Notifications arrive on notify's own thread and are forwarded to a task
    /// on the current runtime, where each path is handled after the debounce
    /// delay. The returned watcher must be kept alive for events to flow.
    pub fn spawn(self, store: Arc<AssetStore>) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    // Reading a file produces access events of its own.
                    if event.kind.is_access() {
                        return;
                    }
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Asset watch error"),
            },
            Config::default(),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        let debounce = self.debounce;
        tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    apply(&store, &path).await;
                });
            }
        });

        tracing::debug!(path = %self.root.display(), "Asset watcher started");
        Ok(watcher)
    }
}

async fn apply(store: &AssetStore, path: &Path) {
    match store.refresh(path).await {
        Ok(Refresh::Added(asset)) => {
            tracing::debug!(%asset, "Watch: added");
            metrics::record_asset_refresh("added");
        }
        Ok(Refresh::Updated(asset)) => {
            tracing::debug!(%asset, "Watch: changed");
            metrics::record_asset_refresh("updated");
        }
        Ok(Refresh::Removed(asset)) => {
            tracing::debug!(%asset, "Watch: removed");
            metrics::record_asset_refresh("removed");
        }
        Ok(Refresh::Skipped) => {}
        Err(e) => tracing::error!(path = %path.display(), error = %e, "Watch: refresh failed, keeping current asset"),
    }
}
