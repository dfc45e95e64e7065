//! Configuration Module
//!
//! Handles loading and managing process configuration from environment variables.
//! Configuration is read once at startup.

use std::env;
use std::str::FromStr;

use crate::cache::CacheSettings;
use crate::content::{DEFAULT_VERSION_TTL, DEFAULT_WARMUP_CONCURRENCY};
use crate::ratelimit::{EndpointClass, RateLimitPolicy, RateLimitPresets};

/// Process configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// TTL in seconds for versioned document entries
    pub page_ttl: u64,
    /// Seconds a document's known modification time is trusted
    pub version_ttl: u64,
    /// Entry count the capacity policy evicts down to
    pub soft_capacity: usize,
    /// Entry count above which the capacity policy kicks in
    pub hard_capacity: usize,
    /// Largest serialized value accepted by the cache, in bytes
    pub max_value_bytes: usize,
    /// Background maintenance interval in seconds
    pub cleanup_interval: u64,
    /// Seconds a finished rate window is kept before being swept
    pub rate_limit_grace: u64,
    /// Rate-limit policies per endpoint class
    pub rate_limits: RateLimitPresets,
    /// Upper bound on a single content source load, in seconds
    pub load_timeout: u64,
    /// Concurrent source loads during a cache warmup
    pub warmup_concurrency: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the upstream document API
    pub content_source_url: Option<String>,
    /// HMAC secret for inbound change events
    pub webhook_secret: Option<String>,
    /// Bearer token for admin cache endpoints
    pub admin_token: Option<String>,
    /// Revalidation sink endpoint
    pub revalidate_url: Option<String>,
    /// Secret passed to the revalidation sink
    pub revalidate_secret: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_DEFAULT` - Default TTL in seconds (default: 3600)
    /// - `CACHE_TTL_PAGE` - Versioned document TTL in seconds (default: 7200)
    /// - `CACHE_TTL_VERSION` - Version marker TTL in seconds (default: 60)
    /// - `CACHE_SOFT_CAPACITY` / `CACHE_HARD_CAPACITY` - Eviction thresholds (default: 500 / 600)
    /// - `CACHE_MAX_VALUE_BYTES` - Largest cacheable value (default: 1 MiB)
    /// - `CLEANUP_INTERVAL` - Maintenance frequency in seconds (default: 300)
    /// - `RATE_LIMIT_GRACE` - Stale window grace in seconds (default: 60)
    /// - `RATE_LIMIT_{STRICT,NORMAL,RELAXED,WEBHOOK}_{MAX,WINDOW}` - Per-class limits
    /// - `CONTENT_LOAD_TIMEOUT` - Content source deadline in seconds (default: 30)
    /// - `WARMUP_CONCURRENCY` - Parallel loads during warmup (default: 5)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CONTENT_SOURCE_URL`, `WEBHOOK_SECRET`, `ADMIN_TOKEN`,
    ///   `REVALIDATE_URL`, `REVALIDATE_SECRET` - Optional collaborators
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let soft_capacity = parse_or(&lookup, "CACHE_SOFT_CAPACITY", defaults.soft_capacity);
        let hard_capacity =
            parse_or(&lookup, "CACHE_HARD_CAPACITY", defaults.hard_capacity).max(soft_capacity);

        let mut rate_limits = defaults.rate_limits.clone();
        for class in EndpointClass::ALL {
            let name = class.as_str().to_uppercase();
            let current = rate_limits.policy(class);
            rate_limits.set(
                class,
                RateLimitPolicy {
                    max_requests: parse_or(
                        &lookup,
                        &format!("RATE_LIMIT_{}_MAX", name),
                        current.max_requests,
                    ),
                    window_secs: parse_or(
                        &lookup,
                        &format!("RATE_LIMIT_{}_WINDOW", name),
                        current.window_secs,
                    )
                    .max(1),
                },
            );
        }

        Self {
            default_ttl: parse_or(&lookup, "CACHE_TTL_DEFAULT", defaults.default_ttl),
            page_ttl: parse_or(&lookup, "CACHE_TTL_PAGE", defaults.page_ttl),
            version_ttl: parse_or(&lookup, "CACHE_TTL_VERSION", defaults.version_ttl),
            soft_capacity,
            hard_capacity,
            max_value_bytes: parse_or(
                &lookup,
                "CACHE_MAX_VALUE_BYTES",
                defaults.max_value_bytes,
            ),
            cleanup_interval: parse_or(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval)
                .max(1),
            rate_limit_grace: parse_or(&lookup, "RATE_LIMIT_GRACE", defaults.rate_limit_grace),
            rate_limits,
            load_timeout: parse_or(&lookup, "CONTENT_LOAD_TIMEOUT", defaults.load_timeout)
                .max(1),
            warmup_concurrency: parse_or(&lookup, "WARMUP_CONCURRENCY", defaults.warmup_concurrency)
                .max(1),
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port),
            content_source_url: text("CONTENT_SOURCE_URL"),
            webhook_secret: text("WEBHOOK_SECRET"),
            admin_token: text("ADMIN_TOKEN"),
            revalidate_url: text("REVALIDATE_URL"),
            revalidate_secret: text("REVALIDATE_SECRET"),
        }
    }

    /// Extracts the settings the cache coordinator is built from.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            default_ttl: self.default_ttl,
            soft_capacity: self.soft_capacity,
            hard_capacity: self.hard_capacity,
            max_value_bytes: self.max_value_bytes,
            rate_limit_grace: self.rate_limit_grace,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        let cache = CacheSettings::default();
        Self {
            default_ttl: cache.default_ttl,
            page_ttl: 7200,
            version_ttl: DEFAULT_VERSION_TTL,
            soft_capacity: cache.soft_capacity,
            hard_capacity: cache.hard_capacity,
            max_value_bytes: cache.max_value_bytes,
            cleanup_interval: 300,
            rate_limit_grace: cache.rate_limit_grace,
            rate_limits: RateLimitPresets::default(),
            load_timeout: 30,
            warmup_concurrency: DEFAULT_WARMUP_CONCURRENCY,
            server_port: 3000,
            content_source_url: None,
            webhook_secret: None,
            admin_token: None,
            revalidate_url: None,
            revalidate_secret: None,
        }
    }
}
