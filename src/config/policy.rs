//! Per-asset policies: a value, or a function of the asset's canonical path.
//!
//! In TOML a policy is either a bare value:
//!
//! ```toml
//! gzip = true
//! max_age = 600
//! ```
//!
//! or an ordered rule table where the first matching pattern wins:
//!
//! ```toml
//! [max_age]
//! default = 600
//! rules = [{ pattern = '\.min\.(?:css|js)$', value = 2592000 }]
//! ```
//!
//! Embedders can also supply an arbitrary closure with [`Policy::custom`].

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer};

/// A single `pattern → value` rule.
#[derive(Clone)]
pub struct PolicyRule<T> {
    pub pattern: Regex,
    pub value: T,
}

/// Value-or-function policy evaluated against a canonical asset path.
#[derive(Clone)]
pub enum Policy<T> {
    Constant(T),
    Rules {
        rules: Vec<PolicyRule<T>>,
        default: T,
    },
    Custom(Arc<dyn Fn(&str) -> T + Send + Sync>),
}

impl<T: Clone> Policy<T> {
    pub fn rules(rules: Vec<(Regex, T)>, default: T) -> Self {
        Policy::Rules {
            rules: rules
                .into_iter()
                .map(|(pattern, value)| PolicyRule { pattern, value })
                .collect(),
            default,
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        Policy::Custom(Arc::new(f))
    }

    /// Resolve the policy for one asset.
    pub fn evaluate(&self, path: &str) -> T {
        match self {
            Policy::Constant(value) => value.clone(),
            Policy::Rules { rules, default } => rules
                .iter()
                .find(|rule| rule.pattern.is_match(path))
                .map(|rule| rule.value.clone())
                .unwrap_or_else(|| default.clone()),
            Policy::Custom(f) => f(path),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Policy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Policy::Rules { rules, default } => {
                let rules: Vec<_> = rules
                    .iter()
                    .map(|rule| (rule.pattern.as_str(), &rule.value))
                    .collect();
                f.debug_struct("Rules")
                    .field("rules", &rules)
                    .field("default", default)
                    .finish()
            }
            Policy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyRepr<T> {
    Constant(T),
    Rules {
        #[serde(default = "Vec::new")]
        rules: Vec<RuleRepr<T>>,
        default: T,
    },
}

#[derive(Deserialize)]
struct RuleRepr<T> {
    pattern: String,
    value: T,
}

impl<'de, T> Deserialize<'de> for Policy<T>
where
    T: Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match PolicyRepr::<T>::deserialize(deserializer)? {
            PolicyRepr::Constant(value) => Ok(Policy::Constant(value)),
            PolicyRepr::Rules { rules, default } => {
                let rules = rules
                    .into_iter()
                    .map(|rule| {
                        Regex::new(&rule.pattern)
                            .map(|pattern| (pattern, rule.value))
                            .map_err(serde::de::Error::custom)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Policy::rules(rules, default))
            }
        }
    }
}
