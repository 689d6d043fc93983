//! Process-local lookup cache contract.
//!
//! The cache maps a raw token to the hashed token plus a row snapshot so
//! the hot lookup path skips the hash and the store round-trip. Staleness
//! is bounded by the fixed 30 second TTL: a rotation or revocation may go
//! unnoticed by cached lookups for at most one TTL window, which is the
//! accepted trade for the per-request savings.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::token::SessionTokenRecord;

/// Fixed TTL for lookup cache entries.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// Cached lookup result: the hashed token alongside the row snapshot
/// that was current when the entry was written.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub hashed_token: String,
    pub record: SessionTokenRecord,
}

/// Process-local mapping from cache key to [`CachedToken`] with
/// per-entry TTL. Implementations must be safe to share across worker
/// threads.
#[async_trait]
pub trait TokenLookupCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedToken>;

    async fn set(&self, key: &str, value: CachedToken, ttl: Duration);
}

/// Cache key for a raw token.
pub fn cache_key(raw_token: &str) -> String {
    format!("auth-token-{raw_token}")
}
