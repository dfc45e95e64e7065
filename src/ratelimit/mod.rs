//! Rate Limit Module
//!
//! Fixed-window per-client request counting that protects the upstream
//! content source. Independent of the cache, swept on the same cadence.

mod client_key;
mod limiter;
mod policy;

pub use client_key::client_key;
pub use limiter::{RateDecision, RateLimiter, RateWindow};
pub use policy::{EndpointClass, RateLimitPolicy, RateLimitPresets};
