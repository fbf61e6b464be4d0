//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → cli.rs (command-line overrides, then validated again)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with every worker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a reload restarts workers, it does not
//!   re-read the file
//! - All fields have defaults to allow minimal configs
//! - Per-asset settings (`gzip`, `max_age`) are a closed [`Policy`] evaluated
//!   at scan/update time, never per request

pub mod cli;
pub mod loader;
pub mod policy;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use policy::Policy;
pub use schema::{
    LoggerKind, LoggingConfig, ObservabilityConfig, RouteConfig, ServerConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
