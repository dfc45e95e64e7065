//! Version-Aware Keys
//!
//! Cache keys that embed the latest modification time of a resource, so an
//! upstream edit naturally produces a new key.

use crate::cache::KeyPattern;

// == Versioned ==
/// A resource carrying modification timestamps (Unix milliseconds).
pub trait Versioned {
    /// Timestamps of the resource itself and of every nested sub-resource.
    fn modification_times(&self) -> Box<dyn Iterator<Item = i64> + '_>;
}

/// Returns the newest modification time across `resources` and everything
/// nested in them, or 0 when nothing carries a timestamp.
pub fn latest_mod_time<'a, T>(resources: impl IntoIterator<Item = &'a T>) -> i64
where
    T: Versioned + 'a,
{
    resources
        .into_iter()
        .flat_map(|resource| resource.modification_times())
        .max()
        .unwrap_or(0)
        .max(0)
}

/// Builds `{prefix}:{resource_id}:v{mod_time}`, or `{prefix}:{resource_id}`
/// when no modification time is known.
pub fn derive_key(prefix: &str, resource_id: &str, mod_time: i64) -> String {
    if mod_time > 0 {
        format!("{}:{}:v{}", prefix, resource_id, mod_time)
    } else {
        format!("{}:{}", prefix, resource_id)
    }
}

/// Hands `invalidate` a pattern selecting every versioned key of
/// `resource_id` except the `current_mod_time` version.
pub fn invalidate_stale_versions<R>(
    resource_id: &str,
    current_mod_time: i64,
    invalidate: impl FnOnce(KeyPattern) -> R,
) -> R {
    invalidate(KeyPattern::StaleVersions {
        resource_id: resource_id.to_string(),
        keep: current_mod_time,
    })
}
