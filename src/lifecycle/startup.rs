//! Startup orchestration.
//!
//! # Responsibilities
//! - Check that the site builds before any worker exists
//! - Bind the shared listener, drop privileges, write the PID file
//! - Start metrics and signal handling
//! - Hand the pool to the supervisor and wait for it to stop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener is bound before privileges are dropped so low ports work
//! - The PID file is written after the drop so the same identity removes it

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::http::{HttpServer, Site, SiteError};
use crate::lifecycle::control::ControlError;
use crate::lifecycle::identity::drop_privileges;
use crate::lifecycle::pidfile::PidFile;
use crate::lifecycle::signals;
use crate::lifecycle::supervisor::Supervisor;
use crate::net::{self, ListenerError};
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// Number of workers: one without clustering, else the configured count or
/// one per available core.
pub fn pool_size(config: &ServerConfig) -> usize {
    if !config.cluster {
        return 1;
    }
    config.workers.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// Switch to the configured user and group, then write the PID file.
///
/// The file is created under the identity that later removes it on stop.
pub fn assume_identity(config: &ServerConfig) -> Result<PidFile, StartupError> {
    drop_privileges(config.user.as_deref(), config.group.as_deref());
    PidFile::create(&config.pid_path).map_err(StartupError::Control)
}

/// Run the coordinator until a stop command completes.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let config = Arc::new(config);

    let site = Site::build(&config).await?;
    tracing::info!(assets = site.store().len(), root = %site.store().root().display(), "Preflight build ok");
    drop(site);

    let listener = net::bind(&config)?;
    let pid_file = assume_identity(&config)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                address = %config.observability.metrics_address,
                error = %e,
                "Invalid metrics address, metrics disabled"
            ),
        }
    }

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let signal_task = signals::listen(commands_tx).map_err(StartupError::Signals)?;

    let size = pool_size(&config);
    tracing::info!(workers = size, cluster = config.cluster, "Starting worker pool");

    let unit = Arc::new(HttpServer::new(Arc::clone(&config), listener));
    Supervisor::new(unit, size)
        .with_pid_file(pid_file)
        .run(commands_rx)
        .await;

    signal_task.abort();
    Ok(())
}
