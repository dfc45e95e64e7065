//! Content Cache - cache and rate-limit coordinator for a remote document API
//!
//! Provides TTL caching with capacity eviction, version-aware keys, fixed-window
//! rate limiting and webhook-driven invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod invalidation;
mod lock;
pub mod models;
pub mod ratelimit;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheCoordinator, CacheSettings};
pub use config::Config;
pub use tasks::spawn_cleanup_task;
