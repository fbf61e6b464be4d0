//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use memserve::config::ServerConfig;
use memserve::lifecycle::{ControlCommand, PoolSnapshot, PoolState, Supervisor};
use memserve::{net, HttpServer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Write `files` (relative path, content) under `root`.
pub fn write_site(root: &Path, files: &[(&str, &[u8])]) {
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Config serving `root` on an ephemeral loopback port.
pub fn config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        path: root.to_path_buf(),
        cluster: false,
        ..ServerConfig::default()
    }
}

/// A running worker pool.
pub struct TestServer {
    pub addr: SocketAddr,
    pub commands: mpsc::Sender<ControlCommand>,
    pub snapshots: watch::Receiver<PoolSnapshot>,
    pool: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(config: ServerConfig, workers: usize) -> Self {
        let listener = net::bind(&config).unwrap();
        let addr = listener.local_addr().unwrap();

        let unit = Arc::new(HttpServer::new(Arc::new(config), listener));
        let supervisor = Supervisor::new(unit, workers);
        let snapshots = supervisor.subscribe();
        let (commands, rx) = mpsc::channel(8);
        let pool = tokio::spawn(supervisor.run(rx));

        let server = Self {
            addr,
            commands,
            snapshots,
            pool,
        };
        server.wait_ready().await;
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Poll until a request is answered with something other than 503.
    pub async fn wait_ready(&self) {
        let client = client();
        for _ in 0..100 {
            if let Ok(response) = client.get(self.url("/")).send().await {
                if response.status() != reqwest::StatusCode::SERVICE_UNAVAILABLE {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("server at {} never became ready", self.addr);
    }

    pub async fn send(&self, command: ControlCommand) {
        self.commands.send(command).await.unwrap();
    }

    pub async fn wait_for(&mut self, f: impl FnMut(&PoolSnapshot) -> bool) -> PoolSnapshot {
        tokio::time::timeout(Duration::from_secs(10), self.snapshots.wait_for(f))
            .await
            .expect("pool did not reach expected state")
            .expect("supervisor dropped")
            .clone()
    }

    /// Stop the pool and wait for every worker to exit.
    pub async fn stop(mut self) {
        self.send(ControlCommand::Stop).await;
        tokio::time::timeout(Duration::from_secs(10), &mut self.pool)
            .await
            .expect("pool did not stop")
            .unwrap();
        assert_eq!(self.snapshots.borrow().state, PoolState::Stopped);
    }
}

/// HTTP client without connection reuse, so every request hits the
/// listener afresh.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Poll `url` until `check` accepts the response body, or give up.
pub async fn eventually<F>(url: &str, mut check: F) -> bool
where
    F: FnMut(reqwest::StatusCode, &[u8]) -> bool,
{
    let client = client();
    for _ in 0..60 {
        if let Ok(response) = client.get(url).send().await {
            let status = response.status();
            let body = response.bytes().await.unwrap_or_default();
            if check(status, &body) {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
