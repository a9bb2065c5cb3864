// src/matching/cache.rs

//! Bounded, TTL'd store for comparable-search results, keyed by a search
//! fingerprint. The only shared mutable state in the subsystem.

use log::{debug, info};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::criteria::SearchCriteria;
use crate::models::scoring::ComparableResult;

/// A search fingerprint: two requests with equal fingerprints would score
/// identically, so the second can replay the first's result.
///
/// Hashes (session, subject reference, price, bedrooms, build area) in a
/// fixed component order. Radius and features are deliberately left out;
/// they do not change which cached ranking is valid within the TTL window.
pub fn fingerprint(session_id: &str, criteria: &SearchCriteria) -> String {
    let components = [
        ("session", session_id.to_string()),
        ("reference", criteria.reference.clone()),
        (
            "price",
            criteria.price.map(|p| p.to_string()).unwrap_or_default(),
        ),
        (
            "bedrooms",
            criteria.bedrooms.map(|b| b.to_string()).unwrap_or_default(),
        ),
        (
            "build_area",
            criteria
                .build_area
                .map(|a| a.to_string())
                .unwrap_or_default(),
        ),
    ];

    let mut hasher = Sha256::new();
    for (key, value) in components {
        hasher.update(format!("{}:{}", key, value).as_bytes());
    }
    hex::encode(hasher.finalize())
}

struct CachedEntry {
    result: ComparableResult,
    stored_at: Instant,
}

struct CacheState {
    entries: LruCache<String, CachedEntry>,
    hits: usize,
    misses: usize,
    expirations: usize,
}

/// LRU-bounded, TTL-expiring result cache with per-fingerprint computation
/// locks.
///
/// `get_or_compute` guarantees at most one scoring pass per fingerprint
/// within the TTL window: concurrent misses on the same fingerprint
/// serialize on a per-key mutex, and the losers find the winner's result on
/// re-check. Distinct fingerprints never block each other beyond the brief
/// map lookups.
pub struct ResultCache {
    state: Mutex<CacheState>,
    /// One computation lock per fingerprint currently being scored.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        info!(
            "Initializing comparable result cache: capacity={}, ttl={:?}",
            capacity, ttl
        );
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                expirations: 0,
            }),
            in_flight: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// A live cached result, or None on miss or TTL expiry. Expired entries
    /// are dropped on sight.
    pub fn get(&self, key: &str) -> Option<ComparableResult> {
        self.lookup(key, true)
    }

    /// The shared lookup path. `record_stats` is false on the under-lock
    /// re-check inside `get_or_compute`, whose miss was already counted by
    /// the first `get`.
    fn lookup(&self, key: &str, record_stats: bool) -> Option<ComparableResult> {
        let mut state = self.state.lock();
        let live = match state.entries.peek(key) {
            Some(entry) => entry.stored_at.elapsed() < self.ttl,
            None => {
                if record_stats {
                    state.misses += 1;
                }
                return None;
            }
        };

        if !live {
            state.entries.pop(key);
            state.expirations += 1;
            if record_stats {
                state.misses += 1;
            }
            debug!("Cache entry for {} expired", &key[..12.min(key.len())]);
            return None;
        }

        if record_stats {
            state.hits += 1;
            if state.hits % 100 == 0 {
                let (hits, misses) = (state.hits, state.misses);
                info!(
                    "Result cache stats - hits: {}, misses: {}, hit rate: {:.2}%",
                    hits,
                    misses,
                    hits as f64 / (hits + misses).max(1) as f64 * 100.0
                );
            }
        }
        // `get` rather than `peek` so the hit refreshes LRU recency.
        state.entries.get(key).map(|e| e.result.clone())
    }

    pub fn insert(&self, key: String, result: ComparableResult) {
        let mut state = self.state.lock();
        state.entries.put(
            key,
            CachedEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    /// Replay the cached result for `key`, or run `compute` and cache what
    /// it returns. Concurrent callers with the same key perform one
    /// computation between them.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> ComparableResult
    where
        F: FnOnce() -> ComparableResult,
    {
        if let Some(result) = self.get(key) {
            return result;
        }

        let key_lock = {
            let mut in_flight = self.in_flight.lock();
            Arc::clone(in_flight.entry(key.to_string()).or_default())
        };

        let result = {
            let _guard = key_lock.lock();
            // Whoever held the lock before us may have filled the entry.
            match self.lookup(key, false) {
                Some(result) => result,
                None => {
                    let result = compute();
                    self.insert(key.to_string(), result.clone());
                    result
                }
            }
        };

        // Release this caller's handle first, then drop the per-key lock
        // once nobody else holds one.
        drop(key_lock);
        let mut in_flight = self.in_flight.lock();
        if let Some(lock) = in_flight.get(key) {
            if Arc::strong_count(lock) == 1 {
                in_flight.remove(key);
            }
        }

        result
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses, expirations) since creation.
    pub fn stats(&self) -> (usize, usize, usize) {
        let state = self.state.lock();
        (state.hits, state.misses, state.expirations)
    }
}
