//! A built site: the asset store plus the routes compiled against it.

use std::sync::Arc;

use crate::assets::{Asset, AssetPolicy, AssetStore, StoreError};
use crate::config::ServerConfig;
use crate::routing::{RouteError, Router};

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[derive(Debug)]
pub struct Site {
    store: Arc<AssetStore>,
    router: Router,
}

impl Site {
    /// Scan the configured root and compile routes against the result.
    pub async fn build(config: &ServerConfig) -> Result<Self, SiteError> {
        let store = AssetStore::build(
            &config.path,
            config.index.clone(),
            AssetPolicy::from_config(config),
        )
        .await?;
        let router = Router::compile(&config.routes, &store)?;
        if !router.is_empty() {
            tracing::debug!(routes = router.len(), "Routes compiled");
        }
        Ok(Self::from_parts(Arc::new(store), router))
    }

    pub fn from_parts(store: Arc<AssetStore>, router: Router) -> Self {
        Self { store, router }
    }

    pub fn store(&self) -> &Arc<AssetStore> {
        &self.store
    }

    /// Exact store hit first, then the first matching route.
    pub fn lookup(&self, path: &str) -> Option<Arc<Asset>> {
        self.store.get(path).or_else(|| self.router.resolve(path))
    }
}
