//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path that missed the asset store
//!     → router.rs (ordered scan)
//!     → matcher.rs (regex test)
//!     → Return: bound asset or no match (404)
//!
//! Route Compilation (at store build):
//!     RouteConfig[]
//!     → Compile regexes
//!     → Bind each target to its asset slot (fail fast if absent)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per store, immutable at runtime
//! - Deterministic: declaration order is the only tie-break
//! - A bound route keeps following live updates of its target

pub mod matcher;
pub mod router;

pub use matcher::Route;
pub use router::{RouteError, Router};
