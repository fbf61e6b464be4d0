//! memserve: serve a directory tree from memory.
//!
//! # Architecture Overview
//!
//! ```text
//!      Operator                         ┌──────────────── coordinator ────────────────┐
//!  ───────────────                      │                                             │
//!  memserve --signal ─── kill(2) ──────▶│ signals ──▶ supervisor ──▶ broadcast bus    │
//!                                       │                │               │            │
//!                                       │          restart on exit       ▼            │
//!      Clients                          │   ┌──────────┐ ┌──────────┐ ┌──────────┐    │
//!  ───────────────  shared listener ───▶│   │ worker-1 │ │ worker-2 │ │ worker-N │    │
//!                                       │   │ store    │ │ store    │ │ store    │    │
//!                                       │   │ routes   │ │ routes   │ │ routes   │    │
//!                                       │   │ watcher  │ │ watcher  │ │ watcher  │    │
//!                                       │   └──────────┘ └──────────┘ └──────────┘    │
//!                                       └─────────────────────────────────────────────┘
//! ```

use clap::Parser;

use memserve::config::cli::Cli;
use memserve::config::{load_config, validate_config, ConfigError, ServerConfig};
use memserve::lifecycle::{send_command, startup, ControlCommand, PidFile};
use memserve::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    if let Some(name) = &cli.signal {
        let command: ControlCommand = name.parse()?;
        let pid = send_command(&PidFile::path_for(&config.pid_path), command)?;
        println!("Sent {command} to process {pid}");
        return Ok(());
    }

    logging::init(&config.logging)?;
    logging::install_panic_hook();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.bind_address(),
        root = %config.path.display(),
        "memserve starting"
    );
    if cli.dev {
        tracing::info!(
            cluster = config.cluster,
            watch = config.watch,
            level = %config.logging.level,
            "Development mode"
        );
    }

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
