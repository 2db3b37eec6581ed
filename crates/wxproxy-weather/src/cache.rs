//! Bounded in-memory TTL cache keyed by normalized city name.
//!
//! Expiry is checked lazily on read; capacity is enforced on write by
//! evicting the oldest insertion. No background sweep.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::types::{CacheStats, NormalizedWeather};

/// Cache key for a city: trimmed and lower-cased.
pub fn normalize_key(city: &str) -> String {
    city.trim().to_lowercase()
}

#[derive(Debug)]
struct CacheEntry {
    value: NormalizedWeather,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

#[derive(Debug)]
pub struct WeatherCache {
    entries: HashMap<String, CacheEntry>,
    insertion_order: VecDeque<String>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl WeatherCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            ttl,
            max_entries,
            clock,
        }
    }

    /// Fresh value for `key`, if any. A stale entry is dropped on the way out.
    pub fn get(&mut self, key: &str) -> Option<NormalizedWeather> {
        let key = normalize_key(key);
        let now = self.clock.now();

        let ttl = self.ttl;
        match self.entries.get(&key).map(|e| e.is_fresh(now, ttl)) {
            Some(true) => self.entries.get(&key).map(|e| e.value.clone()),
            Some(false) => {
                tracing::debug!("Cache entry for '{}' expired", key);
                self.remove_key(&key);
                None
            }
            None => None,
        }
    }

    /// Store `value`, replacing any previous entry for the key and evicting
    /// the oldest entries while at capacity.
    pub fn insert(&mut self, key: &str, value: NormalizedWeather) {
        if self.max_entries == 0 {
            return;
        }

        let key = normalize_key(key);
        if self.entries.contains_key(&key) {
            self.remove_key(&key);
        }

        while self.entries.len() >= self.max_entries {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!("Evicted '{}' from weather cache", oldest);
        }

        self.insertion_order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: self.clock.now(),
            },
        );
    }

    /// Returns true if an entry was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_key(&normalize_key(key))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    /// Drop every stale entry, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();

        self.entries.retain(|_, e| e.is_fresh(now, ttl));
        let entries = &self.entries;
        self.insertion_order.retain(|k| entries.contains_key(k));

        before - self.entries.len()
    }

    /// Number of stored entries, stale ones included until they are touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the live entries. Stale entries that have not been
    /// touched yet are left out; `len` still counts them.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let keys: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|k| self.entries.get(*k).is_some_and(|e| e.is_fresh(now, self.ttl)))
            .cloned()
            .collect();

        CacheStats {
            entries: keys.len(),
            max_entries: self.max_entries,
            ttl_secs: self.ttl.as_secs(),
            keys,
        }
    }

    fn remove_key(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.insertion_order.retain(|k| k != key);
        }
        removed
    }
}
