//! API Module
//!
//! HTTP handlers, rate-limit middleware and routing.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /content/:id` - Cached document with version ETag
//! - `GET /cache/stats` - Cache statistics
//! - `POST /cache/invalidate` - Invalidate keys matching a pattern
//! - `POST /cache/clear` - Remove every entry and reset statistics
//! - `POST /webhooks/content` - Signed change notifications

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
