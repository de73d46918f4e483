//! Optimized-keyword cache
//!
//! Keyed by (description, word, phrase-to-avoid). Entries expire lazily: a
//! lookup older than the TTL removes the entry and misses. On overflow the
//! first-inserted entry is evicted regardless of its hit count; hits are
//! tracked for diagnostics only. Overwriting an existing key keeps its
//! original position in the eviction order.

use super::OptimizedKeywords;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub description: String,
    pub word: Option<String>,
    pub avoid: Option<String>,
}

impl CacheKey {
    pub fn new(description: &str, word: Option<&str>, avoid: Option<&str>) -> Self {
        Self {
            description: description.to_string(),
            word: word.map(str::to_string),
            avoid: avoid.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: OptimizedKeywords,
    hits: u32,
    inserted_at: DateTime<Utc>,
}

/// FIFO cache with lazy time-to-live
#[derive(Debug)]
pub struct KeywordCache {
    entries: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
    capacity: usize,
    ttl: Duration,
}

impl KeywordCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Look up a key, expiring it if older than the TTL
    ///
    /// A hit increments the entry's hit counter and returns a copy marked
    /// `cached`.
    pub fn get(&mut self, key: &CacheKey, now: DateTime<Utc>) -> Option<OptimizedKeywords> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => now - entry.inserted_at > self.ttl,
        };

        if expired {
            self.remove(key);
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.hits = entry.hits.saturating_add(1);
        let mut value = entry.value.clone();
        value.cached = true;
        Some(value)
    }

    /// Store a result with hit counter 0, evicting the oldest insertion at capacity
    pub fn insert(&mut self, key: CacheKey, value: OptimizedKeywords, now: DateTime<Utc>) {
        let mut value = value;
        value.cached = false;
        let entry = CacheEntry {
            value,
            hits: 0,
            inserted_at: now,
        };

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
            return;
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, entry);
    }

    /// Hit counter for a key (without touching expiry)
    pub fn hits(&self, key: &CacheKey) -> Option<u32> {
        self.entries.get(key).map(|e| e.hits)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of hit counters over live entries
    pub fn total_hits(&self) -> u64 {
        self.entries.values().map(|e| u64::from(e.hits)).sum()
    }

    fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}
