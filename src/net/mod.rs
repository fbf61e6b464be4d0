//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator
//!     → listener.rs (bind once, non-blocking)
//!     → every worker adopts a clone of the socket
//!     → axum accept loop per worker
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
