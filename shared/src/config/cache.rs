//! Lookup cache configuration module

use serde::{Deserialize, Serialize};

/// Sizing for the process-local token lookup cache.
///
/// The entry TTL is fixed at 30 seconds by the token service and is not
/// configurable; it bounds how long a rotation or revocation may go
/// unnoticed by a cached lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupCacheConfig {
    /// Maximum number of cached entries
    pub max_entries: u64,
}

impl Default for LookupCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50_000,
        }
    }
}

impl LookupCacheConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_entries = std::env::var("LOOKUP_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_entries);

        Self { max_entries }
    }
}
