//! Integration Tests for the HTTP collaborators
//!
//! Runs a throwaway axum server on a loopback port that plays the upstream
//! document API and the revalidation endpoint, then drives the reqwest-based
//! adapters against it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use content_cache::{
    content::{ContentService, ContentSource, HttpContentSource},
    error::{LoadError, SourceError},
    invalidation::{ChangeEvent, HttpRevalidationSink, InvalidationTrigger, RevalidationSink},
    CacheCoordinator, CacheSettings,
};
use serde_json::json;

#[derive(Clone, Default)]
struct Upstream {
    revalidated: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn document(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "missing" => StatusCode::NOT_FOUND.into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "garbled" => "not a document".into_response(),
        _ => Json(json!({
            "id": id,
            "content": { "title": "Hello" },
            "last_modified": 1_000,
            "blocks": [{ "id": "b1", "last_modified": 4_000 }]
        }))
        .into_response(),
    }
}

async fn revalidate(
    State(upstream): State<Upstream>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    let accepted = params.get("secret").map(String::as_str) == Some("sink-secret");
    upstream.revalidated.lock().unwrap().push(params);
    if accepted {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn spawn_upstream() -> (SocketAddr, Upstream) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/documents/:id", get(document))
        .route("/api/revalidate", post(revalidate))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, upstream)
}

// loopback traffic must not be routed through an environment proxy
fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn source(addr: SocketAddr) -> HttpContentSource {
    HttpContentSource::with_client(client(), format!("http://{addr}/"))
}

fn sink(addr: SocketAddr, secret: Option<&str>) -> HttpRevalidationSink {
    HttpRevalidationSink::with_client(
        client(),
        format!("http://{addr}/api/revalidate"),
        secret.map(str::to_string),
    )
}

// == Content Source ==

#[tokio::test]
async fn test_http_source_loads_document() {
    let (addr, _) = spawn_upstream().await;
    let source = source(addr);

    let document = source.load("abc").await.unwrap();

    assert_eq!(document.id, "abc");
    assert_eq!(document.last_modified, 1_000);
    assert_eq!(document.blocks.len(), 1);
}

#[tokio::test]
async fn test_http_source_maps_statuses() {
    let (addr, _) = spawn_upstream().await;
    let source = source(addr);

    assert!(matches!(
        source.load("missing").await,
        Err(SourceError::NotFound(id)) if id == "missing"
    ));
    assert!(matches!(
        source.load("broken").await,
        Err(SourceError::Status { status: 500, .. })
    ));
    assert!(matches!(source.load("garbled").await, Err(SourceError::Http(_))));
}

#[tokio::test]
async fn test_http_source_unreachable() {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = source(addr);
    assert!(matches!(source.load("abc").await, Err(SourceError::Http(_))));
}

#[tokio::test]
async fn test_content_service_over_http() {
    let (addr, _) = spawn_upstream().await;
    let cache = Arc::new(CacheCoordinator::new(CacheSettings::default()));
    let service = ContentService::new(
        cache.clone(),
        Arc::new(source(addr)),
        7200,
        Duration::from_secs(5),
    );

    let versioned = service.versioned("abc").await.unwrap();
    assert_eq!(versioned.version, "page:abc:v4000");
    assert!(cache.contains("page:abc"));
    assert!(cache.contains("page:abc:v4000"));

    let missing = service.versioned("missing").await;
    assert!(matches!(
        missing,
        Err(LoadError::Loader(SourceError::NotFound(_)))
    ));
    assert!(!cache.contains("page:missing"));
}

// == Revalidation Sink ==

#[tokio::test]
async fn test_http_sink_sends_path_and_secret() {
    let (addr, upstream) = spawn_upstream().await;
    let sink = sink(addr, Some("sink-secret"));

    assert!(sink.revalidate("/docs/abc").await);

    let calls = upstream.revalidated.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["path"], "/docs/abc");
    assert_eq!(calls[0]["secret"], "sink-secret");
}

#[tokio::test]
async fn test_http_sink_reports_rejection() {
    let (addr, _) = spawn_upstream().await;
    let sink = sink(addr, None);

    assert!(!sink.revalidate("/docs/abc").await);
}

#[tokio::test]
async fn test_trigger_notifies_http_sink() {
    let (addr, upstream) = spawn_upstream().await;
    let cache: Arc<CacheCoordinator<String>> = Arc::new(CacheCoordinator::default());
    cache.set("page:abc", "cached".to_string(), None);
    let trigger =
        InvalidationTrigger::new(cache.clone()).with_sink(Arc::new(sink(addr, Some("sink-secret"))));

    let report = trigger.handle(&ChangeEvent::new("page.updated", "abc").with_path("/docs/abc"));
    assert_eq!(report.invalidated, 1);

    // the sink call runs in the background
    let mut delivered = false;
    for _ in 0..50 {
        if !upstream.revalidated.lock().unwrap().is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered, "revalidation request never arrived");
}
