//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;

use crate::config::policy::Policy;

/// Name used for the PID file and the file logger.
pub const SERVICE_NAME: &str = "memserve";

/// Cache lifetime for minified bundles: 30 days.
const LONG_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Cache lifetime for everything else: 10 minutes.
const SHORT_MAX_AGE_SECS: u64 = 10 * 60;

/// Root configuration for the static server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Directory served from memory.
    pub path: PathBuf,

    /// Index file name aliased under its directory path.
    pub index: String,

    /// Run a worker pool. When false a single worker serves traffic.
    pub cluster: bool,

    /// Pool size. Defaults to the number of available CPU cores.
    pub workers: Option<usize>,

    /// Keep the in-memory store in sync with the filesystem.
    pub watch: bool,

    /// Whether to try gzip for an asset.
    pub gzip: Policy<bool>,

    /// `Cache-Control: max-age` for an asset, in seconds.
    pub max_age: Policy<u64>,

    /// Rewrite rules, tested in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Directory holding `<service>.pid`.
    pub pid_path: PathBuf,

    /// User to switch to after binding.
    pub user: Option<String>,

    /// Group to switch to after binding.
    pub group: Option<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            path: PathBuf::from("."),
            index: "index.html".to_string(),
            cluster: true,
            workers: None,
            watch: false,
            gzip: Policy::Constant(true),
            max_age: default_max_age(),
            routes: Vec::new(),
            pid_path: PathBuf::from("."),
            user: None,
            group: None,
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_max_age() -> Policy<u64> {
    match Regex::new(r"\.min\.(?:css|js)$") {
        Ok(minified) => Policy::rules(vec![(minified, LONG_MAX_AGE_SECS)], SHORT_MAX_AGE_SECS),
        Err(_) => Policy::Constant(SHORT_MAX_AGE_SECS),
    }
}

/// Rewrite rule: request paths matching `pattern` serve the asset at `target`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Regular expression tested against the decoded request path.
    pub pattern: String,

    /// Canonical path of an asset that must exist at startup.
    pub target: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerKind {
    Console,
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console or file sink.
    pub logger: LoggerKind,

    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Directory for the file sink.
    pub path: PathBuf,

    /// Emit access records.
    pub access: bool,

    /// Emit access records for 404 responses.
    pub not_found: bool,

    /// Emit access records for 304 responses.
    pub not_modified: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logger: LoggerKind::File,
            level: "info".to_string(),
            path: PathBuf::from("/var/log").join(SERVICE_NAME),
            access: true,
            not_found: true,
            not_modified: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cache_minified_bundles_longer() {
        let config = ServerConfig::default();
        assert_eq!(config.max_age.evaluate("/app.min.js"), LONG_MAX_AGE_SECS);
        assert_eq!(config.max_age.evaluate("/app.min.css"), LONG_MAX_AGE_SECS);
        assert_eq!(config.max_age.evaluate("/app.js"), SHORT_MAX_AGE_SECS);
        assert!(config.gzip.evaluate("/anything"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 8080
            watch = true

            [[routes]]
            pattern = '^/app/'
            target = "/index.html"

            [logging]
            logger = "console"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.watch);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.logging.logger, LoggerKind::Console);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }
}
