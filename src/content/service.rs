//! Content Service
//!
//! Serves documents through the cache coordinator, loading from the content
//! source on a miss and publishing version-aware keys.
//!
//! Each document occupies two keys: `page:{id}` holds the latest known
//! modification time for `version_ttl` seconds, and `page:{id}:v{t}` holds the
//! body for `page_ttl` seconds. Reads resolve the marker first, so once it
//! expires the next read asks the source again and an upstream edit yields
//! a new version.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{derive_key, invalidate_stale_versions, latest_mod_time, CacheCoordinator};
use crate::content::{CachedPage, ContentSource, Document};
use crate::error::{LoadError, SourceError};

/// Key prefix of cached documents.
pub const PAGE_PREFIX: &str = "page";

/// Seconds a known modification time is trusted before the source is asked again.
pub const DEFAULT_VERSION_TTL: u64 = 60;

/// Loads run at once during a warmup.
pub const DEFAULT_WARMUP_CONCURRENCY: usize = 5;

/// A document together with the version-aware key it is published under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedDocument {
    /// `page:{id}:v{mod_time}`, or `page:{id}` when the document carries no timestamps
    pub version: String,
    pub document: Document,
}

/// Outcome of [`ContentService::warmup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmupReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Ids whose load failed, in completion order
    pub failed_ids: Vec<String>,
}

#[derive(Clone)]
pub struct ContentService {
    cache: Arc<CacheCoordinator<CachedPage>>,
    source: Arc<dyn ContentSource>,
    page_ttl: u64,
    version_ttl: u64,
    load_timeout: Duration,
    warmup_concurrency: usize,
}

impl ContentService {
    /// # Arguments
    /// * `cache` - shared coordinator
    /// * `source` - upstream document API
    /// * `page_ttl` - TTL in seconds of version-aware entries
    /// * `load_timeout` - deadline for a single source load
    pub fn new(
        cache: Arc<CacheCoordinator<CachedPage>>,
        source: Arc<dyn ContentSource>,
        page_ttl: u64,
        load_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            source,
            page_ttl,
            version_ttl: DEFAULT_VERSION_TTL,
            load_timeout,
            warmup_concurrency: DEFAULT_WARMUP_CONCURRENCY,
        }
    }

    pub fn with_version_ttl(mut self, secs: u64) -> Self {
        self.version_ttl = secs;
        self
    }

    pub fn with_warmup_concurrency(mut self, loads: usize) -> Self {
        self.warmup_concurrency = loads.max(1);
        self
    }

    pub fn cache(&self) -> &Arc<CacheCoordinator<CachedPage>> {
        &self.cache
    }

    /// Returns the document, loading it from the source on a miss.
    pub async fn document(&self, id: &str) -> Result<Document, LoadError<SourceError>> {
        Ok(self.versioned(id).await?.document)
    }

    /// Returns the document with its version tag.
    ///
    /// A live marker whose body is still cached is served without touching
    /// the source. Otherwise the document is loaded, its body published under
    /// the version-aware key and every older version of it dropped, so at
    /// most one body per document stays cached.
    pub async fn versioned(&self, id: &str) -> Result<VersionedDocument, LoadError<SourceError>> {
        let plain = derive_key(PAGE_PREFIX, id, 0);

        match self.cache.get(&plain) {
            Some(CachedPage::Body(document)) => {
                return Ok(VersionedDocument {
                    version: plain,
                    document,
                })
            }
            Some(CachedPage::Version(mod_time)) => {
                let version = derive_key(PAGE_PREFIX, id, mod_time);
                if let Some(CachedPage::Body(document)) = self.cache.get(&version) {
                    return Ok(VersionedDocument { version, document });
                }
            }
            None => {}
        }

        let document = self.load(id).await?;
        Ok(self.publish(id, document))
    }

    /// Loads every id concurrently, at most `warmup_concurrency` at a time.
    ///
    /// Failures are counted and never stop the remaining loads. Ids already
    /// cached count as successful without reaching the source.
    pub async fn warmup(&self, ids: &[String]) -> WarmupReport {
        info!(count = ids.len(), "warming up content cache");

        let permits = Arc::new(Semaphore::new(self.warmup_concurrency));
        let mut loads = JoinSet::new();
        for id in ids {
            let service = self.clone();
            let permits = Arc::clone(&permits);
            let id = id.clone();
            loads.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = service.versioned(&id).await;
                (id, result)
            });
        }

        let mut report = WarmupReport {
            total: ids.len(),
            ..WarmupReport::default()
        };
        while let Some(joined) = loads.join_next().await {
            match joined {
                Ok((_, Ok(_))) => report.successful += 1,
                Ok((id, Err(err))) => {
                    warn!(id = %id, error = %err, "warmup load failed");
                    report.failed += 1;
                    report.failed_ids.push(id);
                }
                Err(err) => {
                    warn!(error = %err, "warmup load aborted");
                    report.failed += 1;
                }
            }
        }

        info!(
            total = report.total,
            successful = report.successful,
            failed = report.failed,
            "content cache warmup complete"
        );
        report
    }

    async fn load(&self, id: &str) -> Result<Document, LoadError<SourceError>> {
        match tokio::time::timeout(self.load_timeout, self.source.load(id)).await {
            Ok(Ok(document)) => Ok(document),
            Ok(Err(err)) => Err(LoadError::Loader(err)),
            Err(_) => {
                warn!(id = %id, timeout = ?self.load_timeout, "content source load timed out");
                Err(LoadError::TimedOut(self.load_timeout))
            }
        }
    }

    fn publish(&self, id: &str, document: Document) -> VersionedDocument {
        let plain = derive_key(PAGE_PREFIX, id, 0);
        let mod_time = latest_mod_time([&document]);
        invalidate_stale_versions(id, mod_time, |pattern| self.cache.invalidate(pattern));

        if mod_time == 0 {
            self.cache
                .set(plain.clone(), CachedPage::Body(document.clone()), None);
            return VersionedDocument {
                version: plain,
                document,
            };
        }

        let version = derive_key(PAGE_PREFIX, id, mod_time);
        debug!(id = %id, version = %version, "publishing document version");
        match self.cache.try_set(
            version.clone(),
            CachedPage::Body(document.clone()),
            Some(self.page_ttl),
        ) {
            // the marker must never point at a body that was not stored
            Ok(()) => self
                .cache
                .set(plain, CachedPage::Version(mod_time), Some(self.version_ttl)),
            Err(err) => warn!(error = %err, "document body not cached"),
        }

        VersionedDocument { version, document }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::content::Block;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        documents: Mutex<HashMap<String, Document>>,
        loads: AtomicUsize,
    }

    impl FakeSource {
        fn put(&self, id: &str, last_modified: i64, block_times: &[i64]) {
            let document = Document {
                id: id.to_string(),
                content: serde_json::json!({ "body": format!("{id}@{last_modified}") }),
                last_modified,
                blocks: block_times
                    .iter()
                    .enumerate()
                    .map(|(i, t)| Block { id: format!("{id}-b{i}"), last_modified: *t })
                    .collect(),
            };
            self.documents.lock().unwrap().insert(id.to_string(), document);
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn load(&self, id: &str) -> Result<Document, SourceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.documents
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(id.to_string()))
        }
    }

    struct StalledSource;

    #[async_trait]
    impl ContentSource for StalledSource {
        async fn load(&self, _id: &str) -> Result<Document, SourceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(SourceError::NotFound("never".to_string()))
        }
    }

    fn service(source: Arc<dyn ContentSource>) -> ContentService {
        let cache = Arc::new(CacheCoordinator::new(CacheSettings::default()));
        ContentService::new(cache, source, 7200, Duration::from_secs(5))
    }

    fn body(cache: &CacheCoordinator<CachedPage>, key: &str) -> Option<Document> {
        match cache.get(key) {
            Some(CachedPage::Body(document)) => Some(document),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_document_loads_once() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let service = service(source.clone());

        let first = service.document("abc").await.unwrap();
        let second = service.document("abc").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.loads(), 1);
        assert!(service.cache().contains("page:abc"));
    }

    #[tokio::test]
    async fn test_one_body_per_document() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let service = service(source.clone());

        service.versioned("abc").await.unwrap();
        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v100");
        assert_eq!(source.loads(), 1);
        // the marker and a single body
        assert_eq!(service.cache().len(), 2);
        assert_eq!(service.cache().get("page:abc"), Some(CachedPage::Version(100)));
        assert_eq!(body(service.cache(), "page:abc:v100"), Some(versioned.document));
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let source = Arc::new(FakeSource::default());
        let service = service(source.clone());

        let result = service.document("missing").await;
        assert!(matches!(result, Err(LoadError::Loader(SourceError::NotFound(_)))));
        assert!(service.cache().is_empty());

        source.put("missing", 1, &[]);
        assert!(service.document("missing").await.is_ok());
        assert_eq!(source.loads(), 2);
    }

    #[tokio::test]
    async fn test_load_deadline() {
        let cache = Arc::new(CacheCoordinator::new(CacheSettings::default()));
        let service = ContentService::new(
            cache,
            Arc::new(StalledSource),
            7200,
            Duration::from_millis(50),
        );

        let result = service.versioned("abc").await;

        assert!(matches!(result, Err(LoadError::TimedOut(_))));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_versioned_key_uses_latest_block_time() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[50, 300]);
        let service = service(source);

        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v300");
        assert!(service.cache().contains("page:abc:v300"));
    }

    #[tokio::test]
    async fn test_upstream_edit_seen_after_marker_expires() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let service = service(source.clone()).with_version_ttl(0);
        service.versioned("abc").await.unwrap();

        source.put("abc", 200, &[]);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v200");
        assert_eq!(versioned.document.last_modified, 200);
        assert_eq!(source.loads(), 2);
        assert!(body(service.cache(), "page:abc:v200").is_some());
        assert!(!service.cache().contains("page:abc:v100"));
        assert_eq!(service.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_edit_hidden_while_marker_live() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let service = service(source.clone());
        service.versioned("abc").await.unwrap();

        source.put("abc", 200, &[]);
        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v100");
        assert_eq!(source.loads(), 1);
    }

    #[tokio::test]
    async fn test_invalidated_marker_picks_up_new_version() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let service = service(source.clone());
        service.versioned("abc").await.unwrap();

        // upstream edit followed by the webhook-driven invalidation
        source.put("abc", 200, &[]);
        service.cache().delete("page:abc");
        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v200");
        assert!(service.cache().contains("page:abc:v200"));
        assert!(!service.cache().contains("page:abc:v100"));
    }

    #[tokio::test]
    async fn test_missing_body_is_reloaded() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let service = service(source.clone());
        service.versioned("abc").await.unwrap();

        service.cache().delete("page:abc:v100");
        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v100");
        assert_eq!(source.loads(), 2);
        assert!(service.cache().contains("page:abc:v100"));
    }

    #[tokio::test]
    async fn test_unversioned_document_keeps_plain_key() {
        let source = Arc::new(FakeSource::default());
        source.put("plain", 0, &[]);
        let service = service(source.clone());

        let versioned = service.versioned("plain").await.unwrap();
        service.versioned("plain").await.unwrap();

        assert_eq!(versioned.version, "page:plain");
        assert_eq!(service.cache().len(), 1);
        assert_eq!(source.loads(), 1);
        assert!(body(service.cache(), "page:plain").is_some());
    }

    #[tokio::test]
    async fn test_oversized_body_leaves_no_marker() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        let cache = Arc::new(CacheCoordinator::new(CacheSettings {
            max_value_bytes: 16,
            ..CacheSettings::default()
        }));
        let service = ContentService::new(cache, source, 7200, Duration::from_secs(5));

        let versioned = service.versioned("abc").await.unwrap();

        assert_eq!(versioned.version, "page:abc:v100");
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_warmup_survives_failures() {
        let source = Arc::new(FakeSource::default());
        source.put("abc", 100, &[]);
        source.put("xyz", 200, &[]);
        let service = service(source.clone()).with_warmup_concurrency(2);
        let ids: Vec<String> = ["abc", "missing", "xyz"].iter().map(|s| s.to_string()).collect();

        let report = service.warmup(&ids).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_ids, vec!["missing".to_string()]);
        assert!(service.cache().contains("page:abc:v100"));
        assert!(service.cache().contains("page:xyz:v200"));

        // warm entries are served without another load
        service.versioned("abc").await.unwrap();
        assert_eq!(source.loads(), 3);
    }

    #[tokio::test]
    async fn test_warmup_empty() {
        let service = service(Arc::new(FakeSource::default()));

        let report = service.warmup(&[]).await;

        assert_eq!(report, WarmupReport::default());
    }
}
