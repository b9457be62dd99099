//! Cache key generation.

use crate::types::Point;
use serde::{Deserialize, Serialize};

/// Canonical cache key. Coordinates are rendered with six decimals (~0.1 m),
/// so points that differ below that resolution share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Forward-geocoding key: the address text as given.
    pub fn address(address: &str) -> Self {
        Self(address.to_string())
    }

    pub fn reverse(p: Point) -> Self {
        Self::point("reverse", p)
    }

    pub fn elevation(p: Point) -> Self {
        Self::point("elevation", p)
    }

    pub fn point(prefix: &str, p: Point) -> Self {
        Self(format!("{}_{:.6}_{:.6}", prefix, p.lat, p.lon))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CacheKey> for String {
    fn from(k: CacheKey) -> Self {
        k.0
    }
}
