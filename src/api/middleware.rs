//! Rate-limit middleware
//!
//! Gates every route of an endpoint class through the shared rate limiter and
//! stamps the `X-RateLimit-*` headers on the response.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::handlers::AppState;
use crate::error::ApiError;
use crate::ratelimit::{client_key, EndpointClass};

/// Middleware state: the application state plus the class being guarded.
#[derive(Clone)]
pub struct RateLimitGuard {
    pub state: AppState,
    pub class: EndpointClass,
}

impl RateLimitGuard {
    pub fn new(state: AppState, class: EndpointClass) -> Self {
        Self { state, class }
    }
}

/// Counts the request against `{class}:{client}` and rejects it with 429 once
/// the class budget is spent.
pub async fn rate_limit(State(guard): State<RateLimitGuard>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let bucket = format!("{}:{}", guard.class.as_str(), client_key(request.headers(), peer));
    let policy = guard.state.rate_limits.policy(guard.class);

    let decision = guard.state.cache.rate_limiter().check_policy(&bucket, policy);
    if !decision.allowed {
        return ApiError::RateLimited(decision).into_response();
    }

    let mut response = next.run(request).await;
    decision.apply_headers(response.headers_mut());
    response
}
