//! In-memory TTL cache for raw-token lookups.
//!
//! Backed by `moka` so hot lookups skip the hash and the store
//! round-trip. Entries expire individually after the TTL requested at
//! insert time; there is no cross-process coherence, which is the
//! accepted staleness trade.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use sessiond_core::services::token::{CachedToken, TokenLookupCache};
use sessiond_shared::config::cache::LookupCacheConfig;

/// Entry stored with the TTL requested at insert time.
#[derive(Clone)]
struct Entry {
    value: CachedToken,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Process-local lookup cache backed by moka.
#[derive(Clone)]
pub struct MokaTokenCache {
    cache: Cache<String, Entry>,
}

impl MokaTokenCache {
    pub fn new(config: &LookupCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl TokenLookupCache for MokaTokenCache {
    async fn get(&self, key: &str) -> Option<CachedToken> {
        self.cache.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: &str, value: CachedToken, ttl: Duration) {
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
    }
}
