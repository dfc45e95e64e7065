//! Cache Coordinator Module
//!
//! Public cache API: get/set/invalidate/stats, fetch-or-populate, and the
//! periodic maintenance pass. One coordinator is built per process and shared
//! by reference (`Arc`) with request handlers and background tasks.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::eviction::{enforce_capacity, sweep};
use crate::cache::{
    check_value_size, current_timestamp_ms, CacheEntry, CacheStats, CacheStore, KeyPattern,
    DEFAULT_MAX_VALUE_BYTES,
};
use crate::error::{CacheError, LoadError};
use crate::lock::acquire;
use crate::ratelimit::{RateDecision, RateLimiter};

// == Settings ==
/// Tunables the coordinator is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// TTL in seconds for writes that do not name one
    pub default_ttl: u64,
    /// Entry count the capacity policy evicts down to
    pub soft_capacity: usize,
    /// Entry count above which the capacity policy kicks in
    pub hard_capacity: usize,
    /// Largest serialized value accepted, in bytes
    pub max_value_bytes: usize,
    /// Seconds a finished rate window survives before being swept
    pub rate_limit_grace: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: 3600,
            soft_capacity: 500,
            hard_capacity: 600,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            rate_limit_grace: 60,
        }
    }
}

// == Maintenance Report ==
/// What a single maintenance pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub expired: usize,
    pub evicted: usize,
    pub rate_windows: usize,
}

// == Cache Coordinator ==
/// Owns the entry store and the rate-limit windows, each behind its own lock.
#[derive(Debug)]
pub struct CacheCoordinator<V> {
    store: Mutex<CacheStore<V>>,
    limiter: RateLimiter,
    settings: CacheSettings,
}

impl<V> CacheCoordinator<V> {
    // == Constructor ==
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            store: Mutex::new(CacheStore::new()),
            limiter: RateLimiter::new(settings.rate_limit_grace),
            settings,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    // == Delete ==
    /// Removes `key` if present. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) -> bool {
        acquire(&self.store, "cache")
            .map(|mut store| store.delete(key))
            .unwrap_or(false)
    }

    // == Invalidate ==
    /// Removes every key selected by `pattern` (`"*"` selects all keys,
    /// any other string selects keys containing it). Returns the count removed.
    pub fn invalidate(&self, pattern: impl Into<KeyPattern>) -> usize {
        let pattern = pattern.into();
        let count = acquire(&self.store, "cache")
            .map(|mut store| store.remove_matching(&pattern))
            .unwrap_or(0);
        info!(pattern = %pattern, count, "cache entries invalidated");
        count
    }

    // == Clear ==
    /// Removes all entries and resets the statistics.
    pub fn clear(&self) -> usize {
        let count = acquire(&self.store, "cache")
            .map(|mut store| store.clear())
            .unwrap_or(0);
        info!(count, "cache cleared");
        count
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        acquire(&self.store, "cache")
            .map(|store| store.stats())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        acquire(&self.store, "cache")
            .map(|store| store.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true when `key` holds a live entry, without counting a hit or miss.
    pub fn contains(&self, key: &str) -> bool {
        acquire(&self.store, "cache")
            .map(|store| store.contains_live(key, current_timestamp_ms()))
            .unwrap_or(false)
    }

    // == Rate Limiting ==
    /// Counts one request from `client_key`; see [`RateLimiter::check`].
    pub fn rate_check(&self, client_key: &str, max_requests: u32, window_secs: u64) -> RateDecision {
        self.limiter.check(client_key, max_requests, window_secs)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    // == Maintenance ==
    /// Sweeps expired entries, enforces capacity and drops stale rate windows.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        self.run_maintenance_at(current_timestamp_ms())
    }

    pub fn run_maintenance_at(&self, now_ms: u64) -> MaintenanceReport {
        let report = MaintenanceReport {
            expired: sweep(&self.store, now_ms),
            evicted: enforce_capacity(
                &self.store,
                self.settings.soft_capacity,
                self.settings.hard_capacity,
            ),
            rate_windows: self.limiter.sweep_at(now_ms),
        };

        if report == MaintenanceReport::default() {
            debug!("cache maintenance: nothing to remove");
        } else {
            info!(
                expired = report.expired,
                evicted = report.evicted,
                rate_windows = report.rate_windows,
                "cache maintenance completed"
            );
        }
        report
    }
}

impl<V: Clone> CacheCoordinator<V> {
    // == Get ==
    /// Returns the live value for `key`, or `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, current_timestamp_ms())
    }

    pub fn get_at(&self, key: &str, now_ms: u64) -> Option<V> {
        acquire(&self.store, "cache")?.get(key, now_ms)
    }
}

impl<V: Clone + Serialize> CacheCoordinator<V> {
    // == Set ==
    /// Stores `value` for `ttl` seconds (the default TTL when `None`).
    ///
    /// Values whose serialized size exceeds the ceiling are skipped with a
    /// warning; the next read simply misses.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<u64>) {
        if let Err(err) = self.try_set(key, value, ttl) {
            warn!(error = %err, "cache write skipped");
        }
    }

    /// Like [`CacheCoordinator::set`], but reports why a write was refused.
    pub fn try_set(&self, key: impl Into<String>, value: V, ttl: Option<u64>) -> Result<(), CacheError> {
        self.try_set_at(key, value, ttl, current_timestamp_ms())
    }

    pub fn try_set_at(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<u64>,
        now_ms: u64,
    ) -> Result<(), CacheError> {
        let key = key.into();
        check_value_size(&key, &value, self.settings.max_value_bytes)?;

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.settings.default_ttl), now_ms);
        if let Some(mut store) = acquire(&self.store, "cache") {
            store.insert(key, entry);
        }
        Ok(())
    }

    // == Get Or Load ==
    /// Returns the cached value for `key`, or runs `loader` once and caches
    /// its result.
    ///
    /// Loader errors are returned as-is and nothing is cached. No lock is held
    /// while the loader runs, and concurrent misses for the same key may each
    /// run their own loader (last write wins). Dropping the returned future
    /// cancels the load without writing.
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, ttl: Option<u64>, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = loader().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// [`CacheCoordinator::get_or_load`] with a deadline on the loader.
    pub async fn get_or_load_within<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<u64>,
        timeout: Duration,
        loader: F,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = match tokio::time::timeout(timeout, loader()).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return Err(LoadError::Loader(err)),
            Err(_) => {
                warn!(key = %key, ?timeout, "cache loader timed out");
                return Err(LoadError::TimedOut(timeout));
            }
        };
        self.set(key, value.clone(), ttl);
        Ok(value)
    }
}

impl<V> Default for CacheCoordinator<V> {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
