//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time-to-live in seconds
    pub ttl_seconds: u64,
    /// Insertion sequence number, unique within a store
    pub seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the given creation time.
    ///
    /// The sequence number is assigned by the owning store on insert.
    pub fn new(value: V, ttl_seconds: u64, created_at: u64) -> Self {
        Self {
            value,
            created_at,
            ttl_seconds,
            seq: 0,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired at `now_ms`.
    ///
    /// Boundary condition: an entry is live while `now - created_at <= ttl`,
    /// so it only expires once the age strictly exceeds the TTL.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) > self.ttl_seconds.saturating_mul(1000)
    }

    /// Checks whether the entry is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at `now_ms` (0 once expired).
    pub fn ttl_remaining_ms_at(&self, now_ms: u64) -> u64 {
        let expires_at = self
            .created_at
            .saturating_add(self.ttl_seconds.saturating_mul(1000));
        expires_at.saturating_sub(now_ms)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value".to_string(), 60, 1_000);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.ttl_seconds, 60);
        assert!(!entry.is_expired_at(1_000));
    }

    #[test]
    fn test_entry_live_until_ttl_fully_elapsed() {
        let entry = CacheEntry::new("v", 10, 5_000);

        assert!(!entry.is_expired_at(14_999));
        // Age equal to the TTL is still live
        assert!(!entry.is_expired_at(15_000));
        assert!(entry.is_expired_at(15_001));
    }

    #[test]
    fn test_entry_zero_ttl() {
        let entry = CacheEntry::new("v", 0, 5_000);

        assert!(!entry.is_expired_at(5_000));
        assert!(entry.is_expired_at(5_001));
    }

    #[test]
    fn test_clock_skew_does_not_expire() {
        // A creation time in the future (clock stepped back) reads as age 0
        let entry = CacheEntry::new("v", 1, 10_000);
        assert!(!entry.is_expired_at(9_000));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("v", 10, 1_000);

        assert_eq!(entry.ttl_remaining_ms_at(1_000), 10_000);
        assert_eq!(entry.ttl_remaining_ms_at(6_000), 5_000);
        assert_eq!(entry.ttl_remaining_ms_at(20_000), 0);
    }

    #[test]
    fn test_fresh_entry_not_expired() {
        let entry = CacheEntry::new("v", 60, current_timestamp_ms());
        assert!(!entry.is_expired());
    }
}
