//! Control fan-out from the supervisor to its workers.

use tokio::sync::broadcast;

/// Message a worker receives from its supervisor.
///
/// Workers treat both the same way: clean up and exit. Only the supervisor's
/// restart policy tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMessage {
    Reload,
    Stop,
}

/// Broadcast channel every worker subscribes to when it is spawned.
#[derive(Debug)]
pub struct ControlBus {
    tx: broadcast::Sender<WorkerMessage>,
}

impl ControlBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Subscribe a new worker. Only messages sent after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.tx.subscribe()
    }

    /// Send to every current subscriber; returns how many were reached.
    pub fn broadcast(&self, message: WorkerMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    /// Number of workers still holding a subscription.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ControlBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once a reload or stop arrives, or the supervisor goes away.
pub async fn wait_for_exit(control: &mut broadcast::Receiver<WorkerMessage>) -> Option<WorkerMessage> {
    loop {
        match control.recv().await {
            Ok(message) => return Some(message),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
