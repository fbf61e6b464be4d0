//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Preflight build → Bind → Drop privileges → PID file → Supervise
//!
//! Control (signals.rs, control.rs):
//!     SIGHUP → Reload, SIGINT/SIGTERM → Stop, SIGUSR1 → Status
//!     `memserve --signal <cmd>` → PID file → kill(2)
//!
//! Supervision (supervisor.rs, bus.rs):
//!     ControlCommand → Supervisor → WorkerMessage broadcast → every worker
//!     Worker exit while steady → replacement
//! ```
//!
//! # Design Decisions
//! - Workers treat reload and stop alike: they exit. Only the supervisor's
//!   restart policy differs
//! - Stop never kills a worker; it waits for each to finish

pub mod bus;
pub mod control;
pub mod identity;
pub mod pidfile;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use bus::{ControlBus, WorkerMessage};
pub use control::{send_command, ControlCommand, ControlError};
pub use pidfile::PidFile;
pub use supervisor::{PoolSnapshot, PoolState, Supervisor, Unit, WorkerId};
