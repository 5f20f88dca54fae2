//! In-memory TTL cache for price fetch results, keyed by provider.
//!
//! Keys are normalised to lowercase so `"Acme Fibre"` and `"acme fibre"`
//! share an entry. A stale entry behaves as a miss but is not evicted;
//! it is replaced wholesale by the next `put` for the same key, and the
//! whole cache is cleared at the start of every refresh-all run.
//!
//! The cache itself is not `Sync` — callers wrap it in
//! `Arc<Mutex<PriceCache>>` so the batch tasks and the API handlers can
//! share it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::pricing::types::FetchResult;

/// Normalise a provider name into its cache key.
pub fn cache_key(provider_name: &str) -> String {
    provider_name.to_lowercase()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: FetchResult,
    fetched_at: Instant,
}

/// Keyed TTL cache of fetch results.
pub struct PriceCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the cached payload only when still within TTL.
    pub fn get(&self, provider_name: &str) -> Option<FetchResult> {
        self.entries
            .get(&cache_key(provider_name))
            .filter(|entry| entry.fetched_at.elapsed() <= self.ttl)
            .map(|entry| entry.payload.clone())
    }

    /// Overwrite any existing entry for this provider with a fresh timestamp.
    pub fn put(&mut self, provider_name: &str, payload: FetchResult) {
        self.entries.insert(
            cache_key(provider_name),
            CacheEntry {
                payload,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop every entry, stale or fresh.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries held, including stale ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
