//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Route output to the console or to `<path>/memserve.log`
//! - Log uncaught panics instead of letting them vanish on a worker thread
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Thread names identify workers (`worker-N`) in every line
//! - `RUST_LOG` overrides the configured level

use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::SERVICE_NAME;
use crate::config::{LoggerKind, LoggingConfig};

/// Error type for logger initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log path {} does not exist or is not writable: {source}", path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("logger already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{SERVICE_NAME}={},tower_http=warn", config.level))
    });

    match config.logger {
        LoggerKind::Console => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_thread_names(true))
            .try_init()?,
        LoggerKind::File => {
            let file = open_log_file(config)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_thread_names(true)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?
        }
    }

    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<File, LoggingError> {
    let path = config.path.join(format!("{SERVICE_NAME}.log"));
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::Unwritable {
            path: config.path.clone(),
            source,
        })
}

/// Log panics through tracing before unwinding continues.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Uncaught panic");
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            path: dir.path().join("absent"),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            open_log_file(&config),
            Err(LoggingError::Unwritable { .. })
        ));
    }

    #[test]
    fn log_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            path: dir.path().to_path_buf(),
            ..LoggingConfig::default()
        };
        open_log_file(&config).unwrap();
        assert!(dir.path().join("memserve.log").exists());
    }
}
