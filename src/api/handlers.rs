//! API Handlers
//!
//! HTTP request handlers for each endpoint, plus the shared application state.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::cache::CacheCoordinator;
use crate::config::Config;
use crate::content::{CachedPage, ContentService, ContentSource, HttpContentSource, WarmupReport};
use crate::error::{ApiError, Result, WebhookError};
use crate::invalidation::{
    verify_signature, ChangeEvent, HttpRevalidationSink, InvalidationReport, InvalidationTrigger,
    RevalidationSink, SIGNATURE_HEADER,
};
use crate::models::{
    ChallengeResponse, ClearResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    StatsResponse, WarmupRequest,
};
use crate::ratelimit::RateLimitPresets;

/// Application state shared across all handlers.
///
/// Holds the process-wide coordinator by reference; every clone points at
/// the same cache and rate windows.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache coordinator
    pub cache: Arc<CacheCoordinator<CachedPage>>,
    /// Document access through the cache, when a source is configured
    pub content: Option<ContentService>,
    /// Change event handler
    pub trigger: InvalidationTrigger<CachedPage>,
    /// Rate-limit policy per endpoint class
    pub rate_limits: Arc<RateLimitPresets>,
    admin_token: Option<Arc<str>>,
    webhook_secret: Option<Arc<str>>,
}

impl AppState {
    /// Creates a new AppState around the given coordinator, with default rate
    /// limits and no collaborators configured.
    pub fn new(cache: Arc<CacheCoordinator<CachedPage>>) -> Self {
        Self {
            trigger: InvalidationTrigger::new(Arc::clone(&cache)),
            cache,
            content: None,
            rate_limits: Arc::new(RateLimitPresets::default()),
            admin_token: None,
            webhook_secret: None,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the coordinator and wires whichever collaborators the Config names.
    pub fn from_config(config: &Config) -> Self {
        let cache = Arc::new(CacheCoordinator::new(config.cache_settings()));
        let mut state = Self::new(Arc::clone(&cache)).with_rate_limits(config.rate_limits.clone());

        if let Some(url) = &config.content_source_url {
            let content = ContentService::new(
                cache,
                Arc::new(HttpContentSource::new(url.clone())),
                config.page_ttl,
                Duration::from_secs(config.load_timeout),
            )
            .with_version_ttl(config.version_ttl)
            .with_warmup_concurrency(config.warmup_concurrency);
            state = state.with_content(content);
        }
        if let Some(url) = &config.revalidate_url {
            state = state.with_revalidation_sink(Arc::new(HttpRevalidationSink::new(
                url.clone(),
                config.revalidate_secret.clone(),
            )));
        }
        if let Some(token) = &config.admin_token {
            state = state.with_admin_token(token);
        }
        if let Some(secret) = &config.webhook_secret {
            state = state.with_webhook_secret(secret);
        }
        state
    }

    pub fn with_content_source(
        self,
        source: Arc<dyn ContentSource>,
        page_ttl: u64,
        load_timeout: Duration,
    ) -> Self {
        let content = ContentService::new(Arc::clone(&self.cache), source, page_ttl, load_timeout);
        self.with_content(content)
    }

    /// Installs a prepared content service. It must share this state's coordinator.
    pub fn with_content(mut self, content: ContentService) -> Self {
        self.content = Some(content);
        self
    }

    fn content(&self) -> Result<&ContentService> {
        self.content
            .as_ref()
            .ok_or_else(|| ApiError::Upstream("content source is not configured".to_string()))
    }

    pub fn with_revalidation_sink(mut self, sink: Arc<dyn RevalidationSink>) -> Self {
        self.trigger = self.trigger.with_sink(sink);
        self
    }

    pub fn with_rate_limits(mut self, presets: RateLimitPresets) -> Self {
        self.rate_limits = Arc::new(presets);
        self
    }

    pub fn with_admin_token(mut self, token: &str) -> Self {
        self.admin_token = Some(Arc::from(token));
        self
    }

    pub fn with_webhook_secret(mut self, secret: &str) -> Self {
        self.webhook_secret = Some(Arc::from(secret));
        self
    }

    /// Accepts `Authorization: Bearer <admin token>`. Without a configured
    /// token every request is refused.
    fn require_admin(&self, headers: &HeaderMap) -> Result<()> {
        let Some(expected) = self.admin_token.as_deref() else {
            return Err(ApiError::Unauthorized("admin token is not configured".to_string()));
        };

        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        // compare fixed-length digests so timing does not leak the token length
        if Sha256::digest(presented.as_bytes()) != Sha256::digest(expected.as_bytes()) {
            warn!("admin request with invalid token");
            return Err(ApiError::Unauthorized("invalid bearer token".to_string()));
        }
        Ok(())
    }
}

/// Handler for GET /content/:id
///
/// Serves the document through the cache. The `ETag` carries the version key;
/// a matching `If-None-Match` yields 304.
pub async fn content_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let versioned = state.content()?.versioned(&id).await?;
    let etag = format!("\"{}\"", versioned.version);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == etag);

    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Json(versioned.document).into_response()
    };
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    Ok(response)
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.cache.rate_limiter().len(),
    ))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    state.require_admin(&headers)?;
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let invalidated = state.cache.invalidate(req.pattern.as_str());
    Ok(Json(InvalidateResponse {
        pattern: req.pattern,
        invalidated,
    }))
}

/// Handler for POST /cache/clear
pub async fn clear_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>> {
    state.require_admin(&headers)?;

    Ok(Json(ClearResponse {
        cleared: state.cache.clear(),
    }))
}

/// Handler for POST /cache/warmup
///
/// Loads the listed documents through the cache. Individual failures are
/// reported in the body, never as an error status.
pub async fn warmup_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<WarmupRequest>,
) -> Result<Json<WarmupReport>> {
    state.require_admin(&headers)?;
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let report = state.content()?.warmup(&req.ids).await;
    Ok(Json(report))
}

/// Handler for POST /webhooks/content
///
/// Answers the `url_verification` handshake directly. Every other payload must
/// carry a valid signature before it reaches the invalidation trigger.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    if payload.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = payload
            .get("challenge")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::InvalidRequest("No challenge provided".to_string()))?;
        return Ok(Json(ChallengeResponse {
            challenge: challenge.to_string(),
        })
        .into_response());
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = verify_signature(state.webhook_secret.as_deref(), &body, signature) {
        warn!(error = %err, "webhook rejected before invalidation");
        return Err(err.into());
    }

    let event: ChangeEvent = serde_json::from_value(payload)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
    let report: InvalidationReport = state.trigger.handle(&event);

    Ok(Json(report).into_response())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
