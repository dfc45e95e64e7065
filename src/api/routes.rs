//! API Routes
//!
//! Configures the Axum router with all endpoints and their rate-limit classes.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, content_handler, health_handler, invalidate_handler, stats_handler,
    warmup_handler, webhook_handler, AppState,
};
use super::middleware::{rate_limit, RateLimitGuard};
use crate::ratelimit::EndpointClass;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint (not rate limited)
/// - `GET /content/:id` - Cached document (`normal`)
/// - `GET /cache/stats` - Cache statistics (`relaxed`)
/// - `POST /cache/invalidate` - Pattern invalidation, admin only (`strict`)
/// - `POST /cache/clear` - Drop everything, admin only (`strict`)
/// - `POST /cache/warmup` - Preload documents, admin only (`strict`)
/// - `POST /webhooks/content` - Signed change events (`webhook`)
///
/// # Middleware
/// - Rate limiting per endpoint class
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limited = |class: EndpointClass, routes: Router<AppState>| {
        routes.route_layer(middleware::from_fn_with_state(
            RateLimitGuard::new(state.clone(), class),
            rate_limit,
        ))
    };

    let content = limited(
        EndpointClass::Normal,
        Router::new().route("/content/:id", get(content_handler)),
    );
    let stats = limited(
        EndpointClass::Relaxed,
        Router::new().route("/cache/stats", get(stats_handler)),
    );
    let admin = limited(
        EndpointClass::Strict,
        Router::new()
            .route("/cache/invalidate", post(invalidate_handler))
            .route("/cache/clear", post(clear_handler))
            .route("/cache/warmup", post(warmup_handler)),
    );
    let webhooks = limited(
        EndpointClass::Webhook,
        Router::new().route("/webhooks/content", post(webhook_handler)),
    );

    Router::new()
        .route("/health", get(health_handler))
        .merge(content)
        .merge(stats)
        .merge(admin)
        .merge(webhooks)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
