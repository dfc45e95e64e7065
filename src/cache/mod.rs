//! Cache Module
//!
//! In-memory entry storage with TTL expiration, batched eviction, version-aware
//! keys and the coordinator that ties them together.

mod coordinator;
mod entry;
pub mod eviction;
mod pattern;
mod stats;
mod store;
mod version;


// Re-export public types
pub use coordinator::{CacheCoordinator, CacheSettings, MaintenanceReport};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use pattern::KeyPattern;
pub use stats::CacheStats;
pub use store::{check_value_size, CacheStore, EvictionCandidate};
pub use version::{derive_key, invalidate_stale_versions, latest_mod_time, Versioned};

// == Public Constants ==
/// Default ceiling on a serialized value, in bytes
pub const DEFAULT_MAX_VALUE_BYTES: usize = 1024 * 1024; // 1 MB
