//! In-memory static file server.
//!
//! Loads a directory tree into memory at startup, precompresses it, and
//! serves it from a supervised pool of workers with live reload on file
//! changes.

pub mod assets;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use assets::AssetStore;
pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{ControlCommand, Supervisor};
