//! Cache key generation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::sanitize_file_name;

/// Longest key accepted from callers.
const MAX_KEY_LEN: usize = 255;

/// Longest upload name folded into a generated key.
const MAX_NAME_LEN: usize = 100;

/// Opaque token identifying a cached upload.
///
/// Generated keys look like `20240131_154500_<32 hex digits>_report.pdf`.
/// The random component keeps keys unique across calls made within the same
/// second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Generate a fresh key, optionally carrying a sanitized upload name.
    pub fn generate(name: Option<&str>) -> Self {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let unique = Uuid::new_v4().simple();

        let name = name
            .map(sanitize_file_name)
            .map(|name| name.chars().take(MAX_NAME_LEN).collect::<String>())
            .filter(|name| !name.is_empty());

        match name {
            Some(name) => Self(format!("{timestamp}_{unique}_{name}")),
            None => Self(format!("{timestamp}_{unique}")),
        }
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key could have been produced by [`CacheKey::generate`].
    ///
    /// Keys double as file names in directory-backed stores, so anything
    /// outside `[A-Za-z0-9._-]`, or starting with a dot, is rejected.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_KEY_LEN
            && !self.0.starts_with('.')
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
