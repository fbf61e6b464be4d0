//! Worker pool supervision.
//!
//! # Responsibilities
//! - Start one worker unit per pool slot
//! - Replace any unit that exits while the pool is steady, unconditionally
//! - Fan reload/stop out to every live unit
//! - On stop: suppress restarts, remove the PID file, wait for every unit
//!
//! # Design Decisions
//! - Each unit runs on its own named OS thread; a panic is caught and
//!   reported like any other exit
//! - Reload is a rolling restart: units exit on their own and the normal
//!   crash-recovery path brings up fresh replacements
//! - Units are never killed; stop waits for them to finish

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::lifecycle::bus::{ControlBus, WorkerMessage};
use crate::lifecycle::control::ControlCommand;
use crate::lifecycle::pidfile::PidFile;
use crate::observability::metrics;

/// Work executed by one pool slot.
///
/// `run` blocks the unit's thread until the unit decides to exit, normally
/// after receiving a [`WorkerMessage`] on `control`.
pub trait Unit: Send + Sync + 'static {
    type Error: fmt::Display + Send;

    fn run(
        &self,
        id: WorkerId,
        control: broadcast::Receiver<WorkerMessage>,
    ) -> Result<(), Self::Error>;
}

/// Unique identifier of a spawned worker. Replacements get fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Per-worker lifecycle: `Starting → Running → Draining`, then removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Starting,
    Running,
    Draining,
}

#[derive(Debug, Clone)]
pub struct WorkerState {
    pub id: WorkerId,
    pub slot: usize,
    pub status: WorkerStatus,
    pub restarts: u32,
}

/// Pool lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Initializing,
    Steady,
    ShuttingDown,
    Stopped,
}

/// Delay before retrying a slot whose thread could not be spawned.
const RESPAWN_INTERVAL: Duration = Duration::from_secs(1);

/// Point-in-time view of the pool, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub state: PoolState,
    pub live: usize,
    pub restarts: u64,
}

/// How a worker thread ended.
#[derive(Debug)]
enum Exit {
    Clean,
    Failed(String),
    Panicked,
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Clean => f.write_str("clean exit"),
            Exit::Failed(reason) => write!(f, "error: {reason}"),
            Exit::Panicked => f.write_str("panicked"),
        }
    }
}

#[derive(Debug)]
enum WorkerEvent {
    Started(WorkerId),
    Exited { id: WorkerId, exit: Exit },
}

/// Owner of the worker pool.
pub struct Supervisor<U: Unit> {
    unit: Arc<U>,
    size: usize,
    workers: HashMap<WorkerId, WorkerState>,
    /// Slots (and their restart counts) waiting for a thread.
    pending: Vec<(usize, u32)>,
    next_id: u64,
    restarts: u64,
    state: PoolState,
    bus: ControlBus,
    pid_file: Option<PidFile>,
    snapshot: watch::Sender<PoolSnapshot>,
}

impl<U: Unit> Supervisor<U> {
    pub fn new(unit: Arc<U>, size: usize) -> Self {
        let (snapshot, _) = watch::channel(PoolSnapshot {
            state: PoolState::Initializing,
            live: 0,
            restarts: 0,
        });
        Self {
            unit,
            size: size.max(1),
            workers: HashMap::new(),
            pending: Vec::new(),
            next_id: 1,
            restarts: 0,
            state: PoolState::Initializing,
            bus: ControlBus::new(),
            pid_file: None,
            snapshot,
        }
    }

    /// PID file to remove once a stop command arrives.
    pub fn with_pid_file(mut self, pid_file: PidFile) -> Self {
        self.pid_file = Some(pid_file);
        self
    }

    /// Observe pool transitions.
    pub fn subscribe(&self) -> watch::Receiver<PoolSnapshot> {
        self.snapshot.subscribe()
    }

    /// Start the pool and supervise it until a stop completes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ControlCommand>) {
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut respawn = interval(RESPAWN_INTERVAL);
        respawn.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for slot in 0..self.size {
            tracing::info!(slot = slot + 1, "Starting worker");
            self.spawn(slot, 0, &events_tx);
        }
        self.state = PoolState::Steady;
        self.publish();

        while self.state != PoolState::ShuttingDown || !self.workers.is_empty() {
            tokio::select! {
                Some(command) = commands.recv(), if self.state == PoolState::Steady => {
                    self.handle_command(command);
                }
                Some(event) = events.recv() => {
                    self.handle_event(event, &events_tx);
                }
                _ = respawn.tick(), if self.state == PoolState::Steady && !self.pending.is_empty() => {
                    for (slot, restarts) in std::mem::take(&mut self.pending) {
                        tracing::info!(slot = slot + 1, "Retrying worker spawn");
                        self.spawn(slot, restarts, &events_tx);
                    }
                }
            }
            self.publish();
        }

        self.state = PoolState::Stopped;
        self.publish();
        tracing::info!("Worker pool stopped");
    }

    fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Reload => {
                tracing::info!(workers = self.workers.len(), "Reloading, forwarding to workers");
                self.mark_draining();
                self.bus.broadcast(WorkerMessage::Reload);
            }
            ControlCommand::Stop => self.shutdown(),
            ControlCommand::Status => {
                tracing::debug!("Status command has no handler, ignoring");
            }
        }
    }

    fn shutdown(&mut self) {
        self.state = PoolState::ShuttingDown;
        for id in self.workers.keys() {
            tracing::info!(worker = %id, "Sending stop to worker");
        }
        self.mark_draining();
        self.bus.broadcast(WorkerMessage::Stop);

        if let Some(pid_file) = self.pid_file.take() {
            if let Err(e) = pid_file.remove() {
                tracing::error!(path = %pid_file.path().display(), error = %e, "Failed to remove PID file");
            }
        }
    }

    fn handle_event(&mut self, event: WorkerEvent, events: &mpsc::UnboundedSender<WorkerEvent>) {
        match event {
            WorkerEvent::Started(id) => {
                if let Some(worker) = self.workers.get_mut(&id) {
                    if worker.status == WorkerStatus::Starting {
                        worker.status = WorkerStatus::Running;
                    }
                }
            }
            WorkerEvent::Exited { id, exit } => {
                let Some(worker) = self.workers.remove(&id) else {
                    return;
                };
                if self.state == PoolState::ShuttingDown {
                    tracing::info!(worker = %id, %exit, "Worker exited");
                    return;
                }
                tracing::info!(worker = %id, %exit, "Worker died");
                self.restarts += 1;
                metrics::record_worker_restart();
                self.spawn(worker.slot, worker.restarts.saturating_add(1), events);
            }
        }
    }

    fn spawn(&mut self, slot: usize, restarts: u32, events: &mpsc::UnboundedSender<WorkerEvent>) {
        let id = WorkerId(self.next_id);
        self.next_id += 1;

        let unit = Arc::clone(&self.unit);
        let control = self.bus.subscribe();
        let events = events.clone();

        let spawned = thread::Builder::new()
            .name(id.to_string())
            .spawn(move || {
                let _ = events.send(WorkerEvent::Started(id));
                let exit = match panic::catch_unwind(AssertUnwindSafe(|| unit.run(id, control))) {
                    Ok(Ok(())) => Exit::Clean,
                    Ok(Err(e)) => Exit::Failed(e.to_string()),
                    Err(_) => Exit::Panicked,
                };
                let _ = events.send(WorkerEvent::Exited { id, exit });
            });

        match spawned {
            Ok(_) => {
                tracing::info!(worker = %id, slot = slot + 1, restarts, "Worker created");
                self.workers.insert(
                    id,
                    WorkerState {
                        id,
                        slot,
                        status: WorkerStatus::Starting,
                        restarts,
                    },
                );
            }
            Err(e) => {
                tracing::error!(slot = slot + 1, error = %e, "Failed to spawn worker thread, will retry");
                self.pending.push((slot, restarts));
            }
        }
    }

    fn mark_draining(&mut self) {
        for worker in self.workers.values_mut() {
            worker.status = WorkerStatus::Draining;
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(PoolSnapshot {
            state: self.state,
            live: self.workers.len(),
            restarts: self.restarts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::bus::wait_for_exit;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Panics on its first run, then behaves.
    struct Flaky {
        runs: AtomicUsize,
    }

    impl Unit for Flaky {
        type Error = String;

        fn run(
            &self,
            _id: WorkerId,
            mut control: broadcast::Receiver<WorkerMessage>,
        ) -> Result<(), String> {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("simulated crash");
            }
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .map_err(|e| e.to_string())?;
            runtime.block_on(wait_for_exit(&mut control));
            Ok(())
        }
    }

    /// Waits for a control message and counts how often it ran.
    struct Steady {
        runs: AtomicUsize,
    }

    impl Unit for Steady {
        type Error = String;

        fn run(
            &self,
            _id: WorkerId,
            mut control: broadcast::Receiver<WorkerMessage>,
        ) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            loop {
                match control.blocking_recv() {
                    Ok(_) | Err(broadcast::error::RecvError::Closed) => return Ok(()),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }
    }

    async fn wait_until(
        rx: &mut watch::Receiver<PoolSnapshot>,
        f: impl FnMut(&PoolSnapshot) -> bool,
    ) -> PoolSnapshot {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
            .await
            .expect("pool did not reach expected state")
            .expect("supervisor dropped")
            .clone()
    }

    #[tokio::test]
    async fn crashed_worker_is_replaced() {
        let unit = Arc::new(Flaky {
            runs: AtomicUsize::new(0),
        });
        let supervisor = Supervisor::new(Arc::clone(&unit), 2);
        let mut snapshots = supervisor.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let pool = tokio::spawn(supervisor.run(rx));

        let snapshot = wait_until(&mut snapshots, |s| s.restarts >= 1 && s.live == 2).await;
        assert_eq!(snapshot.state, PoolState::Steady);
        assert_eq!(snapshot.restarts, 1);

        tx.send(ControlCommand::Stop).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), pool).await.unwrap().unwrap();
        assert_eq!(snapshots.borrow().state, PoolState::Stopped);
        assert_eq!(unit.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reload_restarts_every_worker() {
        let unit = Arc::new(Steady {
            runs: AtomicUsize::new(0),
        });
        let supervisor = Supervisor::new(Arc::clone(&unit), 3);
        let mut snapshots = supervisor.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let pool = tokio::spawn(supervisor.run(rx));

        wait_until(&mut snapshots, |s| s.state == PoolState::Steady && s.live == 3).await;
        tx.send(ControlCommand::Reload).await.unwrap();

        let snapshot = wait_until(&mut snapshots, |s| s.restarts == 3 && s.live == 3).await;
        assert_eq!(snapshot.state, PoolState::Steady);

        tx.send(ControlCommand::Stop).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), pool).await.unwrap().unwrap();
        assert_eq!(unit.runs.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn slot_left_without_thread_is_retried() {
        let unit = Arc::new(Steady {
            runs: AtomicUsize::new(0),
        });
        let mut supervisor = Supervisor::new(Arc::clone(&unit), 1);
        // Same state a failed `thread::Builder::spawn` leaves behind.
        supervisor.pending.push((1, 0));
        let mut snapshots = supervisor.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let pool = tokio::spawn(supervisor.run(rx));

        let snapshot = wait_until(&mut snapshots, |s| s.live == 2).await;
        assert_eq!(snapshot.state, PoolState::Steady);

        tx.send(ControlCommand::Stop).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), pool).await.unwrap().unwrap();
        assert_eq!(unit.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stop_removes_pid_file_and_does_not_restart() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::create(dir.path()).unwrap();
        let pid_path = pid_file.path().to_path_buf();

        let unit = Arc::new(Steady {
            runs: AtomicUsize::new(0),
        });
        let supervisor = Supervisor::new(Arc::clone(&unit), 2).with_pid_file(pid_file);
        let mut snapshots = supervisor.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let pool = tokio::spawn(supervisor.run(rx));

        wait_until(&mut snapshots, |s| s.live == 2).await;
        tx.send(ControlCommand::Status).await.unwrap();
        tx.send(ControlCommand::Stop).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), pool).await.unwrap().unwrap();

        assert!(!pid_path.exists());
        assert_eq!(unit.runs.load(Ordering::SeqCst), 2);
        let last = snapshots.borrow().clone();
        assert_eq!(last.restarts, 0);
        assert_eq!(last.live, 0);
    }
}
