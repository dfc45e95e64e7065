//! Invalidation Trigger
//!
//! Stateless reactive handler: one change event in, a set of invalidated keys
//! and at most one revalidation request out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheCoordinator, KeyPattern};
use crate::invalidation::{ChangeEvent, RevalidationSink};

// == Report ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationScope {
    /// Only keys of the changed object (and its parent)
    Resource,
    /// Every key, because the event was not understood
    All,
}

/// Outcome of handling one change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub event_type: String,
    pub scope: InvalidationScope,
    pub patterns: Vec<String>,
    pub invalidated: usize,
    /// Path handed to the revalidation sink, if any
    pub revalidate_path: Option<String>,
}

// == Trigger ==
pub struct InvalidationTrigger<V> {
    cache: Arc<CacheCoordinator<V>>,
    sink: Option<Arc<dyn RevalidationSink>>,
}

impl<V> Clone for InvalidationTrigger<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            sink: self.sink.clone(),
        }
    }
}

impl<V> InvalidationTrigger<V> {
    pub fn new(cache: Arc<CacheCoordinator<V>>) -> Self {
        Self { cache, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn RevalidationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Invalidates the keys affected by `event`, then notifies the sink.
    ///
    /// Recognized events remove every key containing the resource id (which
    /// covers both the unversioned and versioned forms) plus the keys of its
    /// parent. Unrecognized events, or events without a resource id, remove
    /// everything. The sink call runs in the background and its failure
    /// never affects the report.
    pub fn handle(&self, event: &ChangeEvent) -> InvalidationReport {
        let patterns = Self::patterns_for(event);
        let scope = if patterns.contains(&KeyPattern::All) {
            warn!(event_type = %event.event_type, "unrecognized change event, invalidating everything");
            InvalidationScope::All
        } else {
            InvalidationScope::Resource
        };

        let invalidated: usize = patterns
            .iter()
            .map(|pattern| self.cache.invalidate(pattern.clone()))
            .sum();

        info!(
            event_type = %event.event_type,
            resource_id = event.resource_id.as_deref().unwrap_or("-"),
            invalidated,
            "change event handled"
        );

        let revalidate_path = event
            .resource_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(str::to_string);
        if let Some(path) = &revalidate_path {
            self.notify_sink(path.clone());
        }

        InvalidationReport {
            event_type: event.event_type.clone(),
            scope,
            patterns: patterns.iter().map(ToString::to_string).collect(),
            invalidated,
            revalidate_path,
        }
    }

    fn patterns_for(event: &ChangeEvent) -> Vec<KeyPattern> {
        let resource_id = event.resource_id.as_deref().filter(|id| !id.is_empty());
        let (Some(_), Some(id)) = (event.kind(), resource_id) else {
            return vec![KeyPattern::All];
        };

        let mut patterns = vec![KeyPattern::from(id)];
        if let Some(parent) = event.parent_id.as_deref() {
            if !parent.is_empty() && parent != id {
                patterns.push(KeyPattern::from(parent));
            }
        }
        patterns
    }

    fn notify_sink(&self, path: String) {
        let Some(sink) = self.sink.clone() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if !sink.revalidate(&path).await {
                        warn!(path = %path, "revalidation sink failed");
                    }
                });
            }
            Err(_) => warn!(path = %path, "no async runtime, revalidation skipped"),
        }
    }
}
