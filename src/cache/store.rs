//! Cache Store Module
//!
//! Keyed entry storage with TTL expiration and hit/miss/write counters.
//! The store itself is single-threaded; the coordinator wraps it in a lock.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::{CacheEntry, CacheStats, KeyPattern};
use crate::error::CacheError;

// == Eviction Candidate ==
/// Identifies one specific insertion of a key, as observed at snapshot time.
///
/// Removal by candidate only succeeds while the key still holds that
/// insertion, so an entry written after the snapshot is never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    pub key: String,
    pub created_at: u64,
    pub seq: u64,
}

// == Cache Store ==
/// Main cache storage with TTL support.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Next insertion sequence number
    next_seq: u64,
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            next_seq: 0,
        }
    }

    // == Insert ==
    /// Stores an entry, fully replacing any previous entry for the key.
    pub fn insert(&mut self, key: String, mut entry: CacheEntry<V>) {
        self.next_seq += 1;
        entry.seq = self.next_seq;
        self.entries.insert(key, entry);
        self.stats.record_set();
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    ///
    /// Deleting an absent key is a no-op.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_deletes(1);
        }
        removed
    }

    // == Remove Matching ==
    /// Removes every key selected by `pattern`, returning the count removed.
    pub fn remove_matching(&mut self, pattern: &KeyPattern) -> usize {
        let before = self.entries.len();
        match pattern {
            KeyPattern::All => self.entries.clear(),
            _ => self.entries.retain(|key, _| !pattern.matches(key)),
        }
        let removed = before - self.entries.len();
        self.stats.record_deletes(removed);
        removed
    }

    // == Clear ==
    /// Removes all entries and resets the statistics. Returns the count removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats = CacheStats::new();
        removed
    }

    // == Snapshots ==
    /// Returns every entry that is expired at `now_ms`.
    pub fn expired_candidates(&self, now_ms: u64) -> Vec<EvictionCandidate> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now_ms))
            .map(|(key, entry)| candidate(key, entry))
            .collect()
    }

    /// Returns every entry ordered oldest insertion first.
    pub fn candidates_oldest_first(&self) -> Vec<EvictionCandidate> {
        let mut candidates: Vec<EvictionCandidate> = self
            .entries
            .iter()
            .map(|(key, entry)| candidate(key, entry))
            .collect();
        candidates.sort_by_key(|c| (c.created_at, c.seq));
        candidates
    }

    // == Candidate Removal ==
    /// Removes the candidate's entry if it is still the same insertion and
    /// still expired at `now_ms`.
    pub fn expire(&mut self, candidate: &EvictionCandidate, now_ms: u64) -> bool {
        let still_expired = self
            .entries
            .get(&candidate.key)
            .is_some_and(|entry| entry.seq == candidate.seq && entry.is_expired_at(now_ms));
        if still_expired {
            self.entries.remove(&candidate.key);
            self.stats.record_expirations(1);
        }
        still_expired
    }

    /// Removes the candidate's entry if it is still the same insertion.
    pub fn evict(&mut self, candidate: &EvictionCandidate) -> bool {
        let same_insertion = self
            .entries
            .get(&candidate.key)
            .is_some_and(|entry| entry.seq == candidate.seq);
        if same_insertion {
            self.entries.remove(&candidate.key);
            self.stats.record_evictions(1);
        }
        same_insertion
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when `key` is physically present, regardless of expiry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true when `key` holds a live entry. Touches no counters.
    pub fn contains_live(&self, key: &str, now_ms: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now_ms))
    }
}

impl<V: Clone> CacheStore<V> {
    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed as a side effect and counted as misses.
    pub fn get(&mut self, key: &str, now_ms: u64) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired_at(now_ms),
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }
}

fn candidate<V>(key: &str, entry: &CacheEntry<V>) -> EvictionCandidate {
    EvictionCandidate {
        key: key.to_string(),
        created_at: entry.created_at,
        seq: entry.seq,
    }
}

// == Value Size Check ==
/// Measures the serialized (JSON) size of `value` and rejects it when it
/// exceeds `max_bytes`.
pub fn check_value_size<V: Serialize>(
    key: &str,
    value: &V,
    max_bytes: usize,
) -> Result<usize, CacheError> {
    let size = serde_json::to_vec(value)
        .map_err(|e| CacheError::Unserializable {
            key: key.to_string(),
            reason: e.to_string(),
        })?
        .len();

    if size > max_bytes {
        return Err(CacheError::ValueTooLarge {
            key: key.to_string(),
            size,
            max: max_bytes,
        });
    }
    Ok(size)
}
