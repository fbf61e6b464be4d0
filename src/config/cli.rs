//! Command-line options layered over the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::policy::Policy;
use crate::config::schema::{LoggerKind, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "memserve")]
#[command(about = "Serve a directory tree from memory", long_about = None)]
pub struct Cli {
    /// Directory to serve.
    pub path: Option<PathBuf>,

    /// Listen port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Listen host.
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Send a control command (reload, stop, status) to a running instance.
    #[arg(short, long)]
    pub signal: Option<String>,

    /// Run a worker pool (true) or a single worker (false).
    #[arg(long)]
    pub cluster: Option<bool>,

    /// Number of workers in the pool.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Development mode: port 8888, no pool, console logger at debug level.
    #[arg(long)]
    pub dev: bool,

    /// Directory holding the PID file.
    #[arg(long)]
    pub pid_path: Option<PathBuf>,

    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use the console logger instead of the file logger.
    #[arg(long)]
    pub console: bool,

    /// Directory for file logs.
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// Watch the served directory and refresh assets in memory.
    #[arg(short, long)]
    pub watch: bool,

    /// Cache max age in seconds for every asset; 0 disables caching.
    #[arg(long)]
    pub max_age: Option<u64>,

    /// Gzip assets (true/false).
    #[arg(long)]
    pub gzip: Option<bool>,

    /// User to run as.
    #[arg(long)]
    pub user: Option<String>,

    /// Group to run as.
    #[arg(long)]
    pub group: Option<String>,
}

impl Cli {
    /// Override file/default settings with whatever was given on the command line.
    pub fn apply(&self, config: &mut ServerConfig) {
        if self.dev {
            config.port = 8888;
            config.cluster = false;
            config.logging.logger = LoggerKind::Console;
            config.logging.level = "debug".to_string();
            config.user = None;
            config.group = None;
        }

        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(cluster) = self.cluster {
            config.cluster = cluster;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(pid_path) = &self.pid_path {
            config.pid_path = pid_path.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.console {
            config.logging.logger = LoggerKind::Console;
        }
        if let Some(log_path) = &self.log_path {
            config.logging.path = log_path.clone();
        }
        if self.watch {
            config.watch = true;
        }
        if let Some(max_age) = self.max_age {
            config.max_age = Policy::Constant(max_age);
        }
        if let Some(gzip) = self.gzip {
            config.gzip = Policy::Constant(gzip);
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(group) = &self.group {
            config.group = Some(group.clone());
        }
    }
}
