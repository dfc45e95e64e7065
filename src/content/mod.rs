//! Content Module
//!
//! The upstream document API as seen by the cache: the document model, the
//! source adapter, and the service that fetches documents through the cache.

mod document;
mod service;
mod source;

pub use document::{Block, CachedPage, Document};
pub use service::{
    ContentService, VersionedDocument, WarmupReport, DEFAULT_VERSION_TTL, DEFAULT_WARMUP_CONCURRENCY,
    PAGE_PREFIX,
};
pub use source::{ContentSource, HttpContentSource};
