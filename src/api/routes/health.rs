//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (every crawl store is readable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::dto::{HealthResponse, StoreHealth};
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 when every registered store answers a first-key read.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    let stores = check_stores(&state).await;

    if stores.values().all(|s| s.status == "ok") {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with per-crawl details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let crawls = check_stores(&state).await;
    let healthy = crawls.values().filter(|s| s.status == "ok").count();

    let overall_status = if healthy == crawls.len() {
        "healthy"
    } else if healthy > 0 {
        "degraded"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: overall_status.to_string(),
        crawls,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Read the first key of every store off the async runtime
async fn check_stores(state: &AppState) -> BTreeMap<String, StoreHealth> {
    let checks = state.catalog().iter().map(|(crawl, store)| {
        let crawl = crawl.clone();
        let store = Arc::clone(store);
        async move {
            let location = store.location().to_string();
            let outcome = tokio::task::spawn_blocking(move || store.first_key()).await;

            let status = match outcome {
                Ok(Ok(Some(_))) => "ok".to_string(),
                Ok(Ok(None)) => "empty".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("check failed: {}", e),
            };
            (crawl, StoreHealth { location, status })
        }
    });

    join_all(checks).await.into_iter().collect()
}
