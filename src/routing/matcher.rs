//! Compiled rewrite rules.
//!
//! # Design Decisions
//! - Patterns are unanchored regexes over the decoded request path; anchor
//!   them explicitly in config when needed
//! - The target slot is bound once, at compile time

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::assets::{Asset, AssetSlot};

/// A rewrite rule bound to the asset it serves.
pub struct Route {
    pattern: Regex,
    target: String,
    slot: Arc<AssetSlot>,
}

impl Route {
    pub fn new(pattern: Regex, target: impl Into<String>, slot: Arc<AssetSlot>) -> Self {
        Self {
            pattern,
            target: target.into(),
            slot,
        }
    }

    /// Returns true if the request path matches this rule.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Current content of the bound asset.
    pub fn asset(&self) -> Arc<Asset> {
        self.slot.load_full()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("target", &self.target)
            .finish()
    }
}
