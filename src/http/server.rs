//! HTTP worker.
//!
//! # Responsibilities
//! - Create the Axum Router around the dispatch handler
//! - Wire up middleware (tracing, request timeout)
//! - Adopt the shared listener into the worker's own runtime
//! - Build the site, optionally watch it, and serve until told to exit
//!
//! The listener starts accepting before the site is built; requests that
//! arrive in between get 503.

use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use axum::Router;
use tokio::sync::{broadcast, oneshot};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::assets::AssetWatcher;
use crate::config::{LoggingConfig, ServerConfig, TimeoutConfig};
use crate::http::dispatch::dispatch;
use crate::http::site::{Site, SiteError};
use crate::lifecycle::bus::{wait_for_exit, WorkerMessage};
use crate::lifecycle::supervisor::{Unit, WorkerId};

/// Why a worker stopped serving.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to adopt listener: {0}")]
    Listener(#[source] std::io::Error),
    #[error("site build failed: {0}")]
    Site(#[from] SiteError),
    #[error("failed to watch assets: {0}")]
    Watch(#[from] notify::Error),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("server task aborted")]
    Aborted,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Empty until the initial build completes.
    pub site: Arc<ArcSwapOption<Site>>,
    pub logging: LoggingConfig,
    /// Requests seen by this worker.
    pub requests: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(logging: LoggingConfig) -> Self {
        Self {
            site: Arc::new(ArcSwapOption::empty()),
            logging,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, timeouts: &TimeoutConfig) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
        .layer(TraceLayer::new_for_http())
}

/// One pool unit: an HTTP server over the shared listener.
pub struct HttpServer {
    config: Arc<ServerConfig>,
    listener: Arc<std::net::TcpListener>,
}

impl HttpServer {
    pub fn new(config: Arc<ServerConfig>, listener: std::net::TcpListener) -> Self {
        Self {
            config,
            listener: Arc::new(listener),
        }
    }

    /// Serve until a reload or stop arrives on `control`.
    pub async fn serve(
        &self,
        id: WorkerId,
        mut control: broadcast::Receiver<WorkerMessage>,
    ) -> Result<(), WorkerError> {
        let listener = self
            .listener
            .try_clone()
            .and_then(tokio::net::TcpListener::from_std)
            .map_err(WorkerError::Listener)?;
        let addr = listener.local_addr().map_err(WorkerError::Listener)?;

        let state = AppState::new(self.config.logging.clone());
        let app = build_router(state.clone(), &self.config.timeouts)
            .into_make_service_with_connect_info::<SocketAddr>();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let site = Site::build(&self.config).await?;
        let _watcher = if self.config.watch {
            Some(AssetWatcher::new(site.store().root()).spawn(Arc::clone(site.store()))?)
        } else {
            None
        };
        let assets = site.store().len();
        state.site.store(Some(Arc::new(site)));
        tracing::info!(worker = %id, address = %addr, assets, "Worker ready");

        let message = wait_for_exit(&mut control).await;
        tracing::info!(worker = %id, ?message, "Worker exiting");

        let _ = shutdown_tx.send(());
        server
            .await
            .map_err(|_| WorkerError::Aborted)?
            .map_err(WorkerError::Serve)?;

        tracing::debug!(worker = %id, "HTTP server stopped");
        Ok(())
    }
}

impl Unit for HttpServer {
    type Error = WorkerError;

    fn run(
        &self,
        id: WorkerId,
        control: broadcast::Receiver<WorkerMessage>,
    ) -> Result<(), WorkerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerError::Runtime)?;
        runtime.block_on(self.serve(id, control))
    }
}
