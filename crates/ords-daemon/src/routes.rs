//! Axum router and all HTTP handlers for ords-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers, so tests can drive the bare router.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ords_cache::{lookup_order, LookupError};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::{
    api_types::{CacheStatus, ErrorResponse, HealthResponse, StatusResponse},
    state::{uptime_secs, AppState},
};

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/order/:order_uid", get(get_order))
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .with_state(state)
}

/// CORS for the public read API: any origin, read-only methods, preflight
/// cached for five minutes.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(300))
}

// GET /order/:order_uid

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(order_uid): Path<String>,
) -> Response {
    match lookup_order(&st.cache, &*st.store, &order_uid).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e @ LookupError::NotFound { .. }) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ LookupError::Store { .. }) => {
            error!(%order_uid, error = %e, "order lookup failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to load order {order_uid}"),
            )
        }
    }
}

// GET /v1/health

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// GET /v1/status

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
            cache: CacheStatus {
                len: st.cache.len(),
                capacity: st.cache.capacity(),
            },
            ingest: st.ingest.snapshot(),
        }),
    )
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
