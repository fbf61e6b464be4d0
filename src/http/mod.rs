//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Shared listener
//!     → server.rs (per-worker Axum server, timeout + trace layers)
//!     → dispatch.rs (method / readiness / lookup / conditional GET)
//!     → site.rs (store lookup, then routes)
//!     → access.rs (access record, when enabled)
//! ```

pub mod access;
pub mod dispatch;
pub mod server;
pub mod site;

pub use dispatch::{negotiate, Outcome};
pub use server::{build_router, AppState, HttpServer, WorkerError};
pub use site::{Site, SiteError};
