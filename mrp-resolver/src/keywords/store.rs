//! Process-wide keyword optimizer state
//!
//! Owns the keyword cache and the provider quota counters behind their own
//! mutexes. One store is created at startup and injected into every
//! [`super::KeywordOptimizer`] that should share it.

use super::cache::{CacheKey, KeywordCache};
use super::quota::QuotaTracker;
use super::OptimizedKeywords;
use mrp_common::Clock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Diagnostic snapshot of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordStoreStats {
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub cache_hits: u64,
    /// Calls counted today per provider
    pub provider_usage: BTreeMap<String, u32>,
}

/// Shared cache and quota state
#[derive(Debug)]
pub struct KeywordStore {
    cache: Mutex<KeywordCache>,
    quota: Mutex<QuotaTracker>,
    clock: Arc<dyn Clock>,
}

impl KeywordStore {
    pub fn new(capacity: usize, ttl: chrono::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: Mutex::new(KeywordCache::new(capacity, ttl)),
            quota: Mutex::new(QuotaTracker::new()),
            clock,
        }
    }

    /// Store configured from `[keywords]`
    pub fn from_config(config: &mrp_common::config::KeywordConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.cache_capacity,
            chrono::Duration::hours(config.cache_ttl_hours),
            clock,
        )
    }

    pub async fn lookup(&self, key: &CacheKey) -> Option<OptimizedKeywords> {
        let now = self.clock.now();
        self.cache.lock().await.get(key, now)
    }

    pub async fn remember(&self, key: CacheKey, value: OptimizedKeywords) {
        let now = self.clock.now();
        self.cache.lock().await.insert(key, value, now);
    }

    pub async fn cache_hits(&self, key: &CacheKey) -> Option<u32> {
        self.cache.lock().await.hits(key)
    }

    /// Count a call against a provider's daily budget
    pub async fn try_acquire(&self, provider: &str, daily_limit: u32) -> bool {
        let today = self.clock.today();
        self.quota.lock().await.try_acquire(provider, daily_limit, today)
    }

    /// Mark a provider as spent for the rest of the day
    pub async fn exhaust(&self, provider: &str, daily_limit: u32) {
        let today = self.clock.today();
        self.quota.lock().await.exhaust(provider, daily_limit, today);
    }

    pub async fn stats(&self) -> KeywordStoreStats {
        let today = self.clock.today();
        let (cache_entries, cache_capacity, cache_hits) = {
            let cache = self.cache.lock().await;
            (cache.len(), cache.capacity(), cache.total_hits())
        };
        let provider_usage = self.quota.lock().await.snapshot(today);

        KeywordStoreStats {
            cache_entries,
            cache_capacity,
            cache_hits,
            provider_usage,
        }
    }
}
