//! Route lookup.
//!
//! # Responsibilities
//! - Compile configured routes against a built asset store
//! - Resolve a request path that missed the store to the first matching route
//!
//! # Design Decisions
//! - Immutable after construction
//! - O(n) scan in declaration order; first match wins
//! - A target missing from the store is a startup error, not a runtime 404

use std::sync::Arc;

use regex::Regex;

use crate::assets::{Asset, AssetStore};
use crate::config::RouteConfig;
use crate::routing::matcher::Route;

/// Error type for route compilation.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("route target {target} not found, please check routes")]
    MissingTarget { target: String },
}

/// Ordered list of rewrite rules.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes, binding each to its target asset.
    pub fn compile(configs: &[RouteConfig], store: &AssetStore) -> Result<Self, RouteError> {
        let routes = configs
            .iter()
            .map(|config| {
                let pattern = Regex::new(&config.pattern).map_err(|source| RouteError::Pattern {
                    pattern: config.pattern.clone(),
                    source,
                })?;
                let slot = store
                    .slot(&config.target)
                    .ok_or_else(|| RouteError::MissingTarget {
                        target: config.target.clone(),
                    })?;
                Ok(Route::new(pattern, config.target.clone(), slot))
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        Ok(Self { routes })
    }

    /// Asset of the first route matching `path`.
    pub fn resolve(&self, path: &str) -> Option<Arc<Asset>> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(Route::asset)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
