//! Key Pattern Module
//!
//! Selects cache keys for bulk invalidation.

use std::fmt;

// == Key Pattern ==
/// Selects a set of cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Every key (`"*"`)
    All,
    /// Keys containing the given substring
    Contains(String),
    /// Versioned keys of `resource_id` (`...:{resource_id}:v{n}`) whose version is not `keep`
    StaleVersions { resource_id: String, keep: i64 },
}

impl KeyPattern {
    /// Returns true when `key` is selected by this pattern.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::All => true,
            KeyPattern::Contains(needle) => key.contains(needle.as_str()),
            KeyPattern::StaleVersions { resource_id, keep } => {
                let marker = format!(":{}:v", resource_id);
                key.match_indices(marker.as_str()).any(|(idx, _)| {
                    let suffix = &key[idx + marker.len()..];
                    match suffix.parse::<i64>() {
                        Ok(version) => version != *keep,
                        Err(_) => false,
                    }
                })
            }
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        if pattern == "*" {
            KeyPattern::All
        } else {
            KeyPattern::Contains(pattern.to_string())
        }
    }
}

impl From<String> for KeyPattern {
    fn from(pattern: String) -> Self {
        KeyPattern::from(pattern.as_str())
    }
}

impl From<&String> for KeyPattern {
    fn from(pattern: &String) -> Self {
        KeyPattern::from(pattern.as_str())
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::All => write!(f, "*"),
            KeyPattern::Contains(needle) => write!(f, "{}", needle),
            KeyPattern::StaleVersions { resource_id, keep } => {
                write!(f, "{}:v* except v{}", resource_id, keep)
            }
        }
    }
}
