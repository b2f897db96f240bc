//! In-process scenario tests for ords-daemon HTTP endpoints.
//!
//! Each test builds the Axum router over an in-memory store and drives it via
//! `tower::ServiceExt::oneshot`; no socket is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use ords_cache::OrderCache;
use ords_daemon::{routes, state::AppState};
use ords_ingest::IngestCounters;
use ords_testkit::{sample_order, MemOrderStore};
use tower::ServiceExt; // oneshot

struct Fixture {
    cache: Arc<OrderCache>,
    store: Arc<MemOrderStore>,
    router: axum::Router,
}

fn fixture(store: MemOrderStore) -> Fixture {
    let cache = Arc::new(OrderCache::new(4).expect("capacity"));
    let store = Arc::new(store);
    let st = AppState::new(
        Arc::clone(&cache),
        store.clone(),
        Arc::new(IngestCounters::default()),
    )
    .with_config_hash("abc123");
    Fixture {
        cache,
        store,
        router: routes::build_router(Arc::new(st)),
    }
}

/// Drive the router with a single GET and return (status, body_bytes).
async fn get(router: axum::Router, uri: &str) -> (StatusCode, bytes::Bytes) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    call(router, req).await
}

async fn call(
    router: axum::Router,
    req: Request<axum::body::Body>,
) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

#[tokio::test]
async fn cached_order_is_served_without_store_read() {
    let f = fixture(MemOrderStore::new());
    f.cache.add(sample_order("cached-1"));

    let (status, body) = get(f.router, "/order/cached-1").await;
    assert_eq!(status, StatusCode::OK);

    let got: ords_schemas::Order = serde_json::from_slice(&body).expect("order json");
    assert_eq!(got, sample_order("cached-1"));
    assert_eq!(f.store.fetch_calls(), 0);
}

#[tokio::test]
async fn stored_order_is_served_and_admitted_to_cache() {
    let f = fixture(MemOrderStore::with_orders([sample_order("db-1")]));

    let (status, body) = get(f.router, "/order/db-1").await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["order_uid"], "db-1");
    assert_eq!(json["shardkey"], "9");
    assert_eq!(json["items"][0]["chrt_id"], 9_934_930);
    assert!(f.cache.contains("db-1"));
}

#[tokio::test]
async fn unknown_order_is_404_with_error_body() {
    let f = fixture(MemOrderStore::new());

    let (status, body) = get(f.router, "/order/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        parse_json(body),
        serde_json::json!({ "error": "order nope not found" })
    );
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn store_failure_is_500() {
    let store = MemOrderStore::with_orders([sample_order("x")]);
    store.fail_reads(true);
    let f = fixture(store);

    let (status, body) = get(f.router, "/order/x").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(parse_json(body)["error"].is_string());
}

#[tokio::test]
async fn health_returns_200_ok_true() {
    let f = fixture(MemOrderStore::new());

    let (status, body) = get(f.router, "/v1/health").await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "ords-daemon");
}

#[tokio::test]
async fn status_reports_cache_and_ingest_counters() {
    let f = fixture(MemOrderStore::new());
    f.cache.add(sample_order("a"));
    f.cache.add(sample_order("b"));

    let (status, body) = get(f.router, "/v1/status").await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["cache"]["len"], 2);
    assert_eq!(json["cache"]["capacity"], 4);
    assert_eq!(json["ingest"]["received"], 0);
    assert_eq!(json["config_hash"], "abc123");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let f = fixture(MemOrderStore::new());
    let (status, _) = get(f.router, "/orders").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uptime_counts_from_state_construction_not_first_request() {
    let f = fixture(MemOrderStore::new());
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, body) = get(f.router, "/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    let uptime = parse_json(body)["uptime_secs"].as_u64().expect("uptime_secs");
    assert!(uptime >= 1, "uptime should include time before the first request, got {uptime}");
}

#[tokio::test]
async fn cors_allows_any_origin_for_reads() {
    let f = fixture(MemOrderStore::with_orders([sample_order("cors-1")]));
    let router = f.router.layer(routes::cors_layer());

    let req = Request::builder()
        .method("GET")
        .uri("/order/cors-1")
        .header(header::ORIGIN, "https://shop.example.com")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn cors_preflight_is_cached_for_five_minutes() {
    let f = fixture(MemOrderStore::new());
    let router = f.router.layer(routes::cors_layer());

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/order/anything")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    assert!(resp.status().is_success());

    let h = resp.headers();
    assert_eq!(
        h.get(header::ACCESS_CONTROL_MAX_AGE).and_then(|v| v.to_str().ok()),
        Some("300")
    );
    let methods = h
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(methods.contains("GET"), "allowed methods: {methods}");
}
