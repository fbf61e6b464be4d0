//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that route patterns compile and targets are canonical paths
//! - Validate value ranges (worker count, index name)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Route targets are checked against the asset store later, at build time

use regex::Regex;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("index file name must be a plain file name, got {0:?}")]
    BadIndex(String),
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("route {index}: invalid pattern {pattern:?}: {reason}")]
    BadRoutePattern {
        index: usize,
        pattern: String,
        reason: String,
    },
    #[error("route {index}: target {target:?} must start with '/'")]
    BadRouteTarget { index: usize, target: String },
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    if config.index.is_empty() || config.index.contains('/') {
        errors.push(ValidationError::BadIndex(config.index.clone()));
    }

    if config.workers == Some(0) {
        errors.push(ValidationError::ZeroWorkers);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for (index, route) in config.routes.iter().enumerate() {
        if let Err(e) = Regex::new(&route.pattern) {
            errors.push(ValidationError::BadRoutePattern {
                index,
                pattern: route.pattern.clone(),
                reason: e.to_string(),
            });
        }
        if !route.target.starts_with('/') {
            errors.push(ValidationError::BadRouteTarget {
                index,
                target: route.target.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
