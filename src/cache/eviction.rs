//! Eviction Policy Module
//!
//! Age-based and capacity-based pruning over a shared [`CacheStore`].
//!
//! Both passes take a snapshot of candidates under the lock, then remove them
//! in batches, releasing the lock between batches so foreground reads and
//! writes are not starved. Entries written after the snapshot are never
//! removed (see [`EvictionCandidate`]).

use std::sync::Mutex;

use crate::cache::{CacheStore, EvictionCandidate};
use crate::lock::acquire;

/// Number of removals performed per lock acquisition.
pub const SWEEP_BATCH_SIZE: usize = 256;

// == Sweep ==
/// Removes every entry that is expired at `now_ms`, regardless of capacity.
///
/// Returns the number of entries pruned.
pub fn sweep<V>(store: &Mutex<CacheStore<V>>, now_ms: u64) -> usize {
    let candidates = match acquire(store, "cache") {
        Some(guard) => guard.expired_candidates(now_ms),
        None => return 0,
    };

    remove_in_batches(store, &candidates, |guard, candidate| {
        guard.expire(candidate, now_ms)
    })
}

// == Enforce Capacity ==
/// When the store holds more than `hard_cap` entries, evicts the oldest
/// insertions until at most `soft_cap` remain.
///
/// This orders by insertion time, not access recency. Returns the number of
/// entries evicted.
pub fn enforce_capacity<V>(store: &Mutex<CacheStore<V>>, soft_cap: usize, hard_cap: usize) -> usize {
    let candidates = match acquire(store, "cache") {
        Some(guard) if guard.len() > hard_cap => guard.candidates_oldest_first(),
        _ => return 0,
    };

    let mut evicted = 0;
    for batch in candidates.chunks(SWEEP_BATCH_SIZE) {
        let Some(mut guard) = acquire(store, "cache") else {
            break;
        };
        for candidate in batch {
            if guard.len() <= soft_cap {
                return evicted;
            }
            if guard.evict(candidate) {
                evicted += 1;
            }
        }
        drop(guard);
        std::thread::yield_now();
    }
    evicted
}

fn remove_in_batches<V>(
    store: &Mutex<CacheStore<V>>,
    candidates: &[EvictionCandidate],
    mut remove: impl FnMut(&mut CacheStore<V>, &EvictionCandidate) -> bool,
) -> usize {
    let mut removed = 0;
    for batch in candidates.chunks(SWEEP_BATCH_SIZE) {
        let Some(mut guard) = acquire(store, "cache") else {
            break;
        };
        removed += batch
            .iter()
            .filter(|candidate| remove(&mut *guard, *candidate))
            .count();
        drop(guard);
        std::thread::yield_now();
    }
    removed
}
