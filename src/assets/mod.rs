//! In-memory asset subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     root directory
//!     → scan.rs (recursive walk, read every regular file)
//!     → asset.rs (mime lookup, max-age policy, gzip on the blocking pool)
//!     → store.rs (canonical path → slot, index aliases, duplicate check)
//!
//! Live invalidation (optional):
//!     notify event → watcher.rs (debounce) → store.refresh(path)
//! ```
//!
//! # Design Decisions
//! - Each worker owns its own store; there is no cross-worker sharing
//! - Compressed form is kept only when strictly smaller, and then replaces
//!   the raw bytes
//! - Updates swap whole assets; readers never see partial state

pub mod asset;
pub mod compress;
pub mod mime;
pub mod scan;
pub mod store;
pub mod watcher;

pub use asset::{Asset, AssetPolicy, Payload};
pub use store::{AssetSlot, AssetStore, Refresh, StoreError};
pub use watcher::AssetWatcher;
