//! Cached city-weather lookup.
//!
//! Concurrent misses for the same city are collapsed: the first caller
//! fetches while later callers wait on a per-key gate and then read the
//! freshly cached value. Failures are never cached, so a waiter behind a
//! failed fetch makes its own upstream call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::instrument;
use wxproxy_core::WeatherConfig;

use crate::cache::{normalize_key, WeatherCache};
use crate::error::WeatherError;
use crate::provider::WeatherProvider;
use crate::types::{CacheStats, Lookup, NormalizedWeather};

/// Per-key fetch gate plus the number of lookups currently holding a ticket for it.
#[derive(Debug)]
struct FetchGate {
    lock: Arc<tokio::sync::Mutex<()>>,
    holders: usize,
}

type InFlight = Mutex<HashMap<String, FetchGate>>;

/// A lookup's claim on a key's gate. Dropping it, on return or when the
/// lookup future is cancelled, releases the claim and removes the gate once
/// no other lookup holds one.
struct GateTicket<'a> {
    in_flight: &'a InFlight,
    key: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> GateTicket<'a> {
    fn acquire(in_flight: &'a InFlight, key: &'a str) -> Self {
        let mut gates = in_flight.lock();
        let gate = gates.entry(key.to_string()).or_insert_with(|| FetchGate {
            lock: Arc::new(tokio::sync::Mutex::new(())),
            holders: 0,
        });
        gate.holders += 1;

        Self {
            in_flight,
            key,
            lock: Arc::clone(&gate.lock),
        }
    }
}

impl Drop for GateTicket<'_> {
    fn drop(&mut self) {
        let mut gates = self.in_flight.lock();
        if let Some(gate) = gates.get_mut(self.key) {
            gate.holders = gate.holders.saturating_sub(1);
            if gate.holders == 0 {
                gates.remove(self.key);
            }
        }
    }
}

#[derive(Debug)]
pub struct WeatherLookupCache {
    provider: WeatherProvider,
    cache: Mutex<WeatherCache>,
    in_flight: InFlight,
}

impl WeatherLookupCache {
    pub fn new(provider: WeatherProvider, cache: WeatherCache) -> Self {
        Self {
            provider,
            cache: Mutex::new(cache),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let provider = WeatherProvider::from_config(config)?;
        let cache = WeatherCache::new(config.ttl(), config.max_entries);
        tracing::info!(
            "Weather lookup ready (ttl {}s, max {} entries)",
            config.ttl_secs,
            config.max_entries
        );
        Ok(Self::new(provider, cache))
    }

    /// Look up current weather for `city`, serving from cache when fresh.
    #[instrument(skip(self), level = "info")]
    pub async fn lookup(&self, city: &str) -> Result<Lookup, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::InvalidInput("City name is required".to_string()));
        }

        let key = normalize_key(city);
        if let Some(weather) = self.cached(&key) {
            tracing::debug!("Cache hit for '{}'", key);
            return Ok(Lookup::cached(weather));
        }

        let ticket = GateTicket::acquire(&self.in_flight, &key);
        let _guard = ticket.lock.lock().await;
        let result = match self.cached(&key) {
            Some(weather) => {
                tracing::debug!("'{}' was fetched while waiting", key);
                Ok(Lookup::cached(weather))
            }
            None => self.fetch_and_store(city, &key).await,
        };

        result
    }

    /// Drop the cached entry for `city`. Returns true if one existed.
    pub fn invalidate(&self, city: &str) -> bool {
        self.cache.lock().remove(city)
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
        tracing::info!("Weather cache cleared");
    }

    /// Remove stale entries now instead of waiting for them to be read.
    pub fn purge_expired(&self) -> usize {
        let removed = self.cache.lock().purge_expired();
        if removed > 0 {
            tracing::debug!("Purged {} expired weather entries", removed);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    fn cached(&self, key: &str) -> Option<NormalizedWeather> {
        self.cache.lock().get(key)
    }

    async fn fetch_and_store(&self, city: &str, key: &str) -> Result<Lookup, WeatherError> {
        tracing::debug!("Cache miss for '{}', fetching upstream", key);

        let raw = self.provider.fetch_current(city).await.map_err(|e| {
            tracing::warn!("Weather lookup for '{}' failed: {}", city, e);
            e
        })?;

        let weather = NormalizedWeather::from_api(raw, Utc::now());
        self.cache.lock().insert(key, weather.clone());
        tracing::info!(
            "Fetched weather for {}, {}: {}°C {}",
            weather.city,
            weather.country,
            weather.temperature,
            weather.condition.text
        );

        Ok(Lookup::fresh(weather))
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}
