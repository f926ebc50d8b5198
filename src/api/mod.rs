//! Crawlmeta REST API
//!
//! HTTP API layer for Crawlmeta, built with Axum.
//!
//! # Endpoints
//!
//! ## Crawls
//! - `GET /crawls` - Registered crawl ids
//!
//! ## Query
//! - `GET /query_domain?domain=..` - Federated domain lookup
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! Every error, including unknown routes, is answered with the envelope
//! `{message, status, traceback, version}`.
//!
//! # Example
//!
//! ```rust,no_run
//! use crawlmeta::api::{serve, ApiConfig, AppState};
//! use crawlmeta::query::QueryEngine;
//! use crawlmeta::storage::Catalog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(Catalog::register(&["/data/crawl-2015-27.db"])?);
//!     let engine = Arc::new(QueryEngine::new(catalog));
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(engine, config.clone());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{Admission, ApiConfig, AppState};

use axum::{http::Uri, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/crawls", get(routes::crawls::list_crawls))
        .route("/query_domain", get(routes::query::query_domain))
        .nest("/health", health_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("The path '{}' was not found.", uri.path()))
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Crawlmeta API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Crawlmeta API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryEngine;
    use crate::storage::{key, Catalog, MemoryStore, StoreHandle};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn crawl_store(crawl: &str, uris: &[&str]) -> StoreHandle {
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = uris
            .iter()
            .map(|uri| {
                (
                    key::encode("example", uri, crawl).unwrap(),
                    serde_json::to_vec(&json!({"crawl": crawl})).unwrap(),
                )
            })
            .collect();
        entries.push((
            key::encode("other", "http://other.com/", crawl).unwrap(),
            b"{}".to_vec(),
        ));
        Arc::new(MemoryStore::from_entries(crawl, entries))
    }

    fn create_test_app() -> Router {
        let catalog = Catalog::from_stores(vec![
            crawl_store("2015_32", &["http://example.com/a", "http://example.org/"]),
            crawl_store("2015_27", &["http://example.com/a", "http://example.com/b"]),
        ])
        .unwrap();
        let engine = Arc::new(QueryEngine::new(Arc::new(catalog)));

        build_router(AppState::new(engine, ApiConfig::default()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (status, body) = get_json(create_test_app(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["crawls"]["2015_27"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_crawls_sorted() {
        let (status, body) = get_json(create_test_app(), "/crawls").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"crawls": ["2015_27", "2015_32"]}));
    }

    #[tokio::test]
    async fn test_crawls_pretty() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/crawls?pretty=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["content-type"], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("{\n  \"crawls\""));
        assert!(text.ends_with("}\n"));
    }

    #[tokio::test]
    async fn test_query_domain() {
        let (status, body) = get_json(create_test_app(), "/query_domain?domain=example.com").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query_domain"], "example");
        assert_eq!(body["query_crawl"], "");
        assert_eq!(body["query_path"], "");
        assert_eq!(body["db_key"], "example ");
        assert_eq!(
            body["unique_urls"],
            json!(["http://example.com/a", "http://example.com/b"])
        );
        assert_eq!(body["skipped_keys"], json!(["example http://example.org/ 2015_32"]));
        assert_eq!(body["complete"], true);
        assert_eq!(body["malformed"], 0);
        assert!(body.get("data").is_none());
        assert!(body.get("time").is_none());
    }

    #[tokio::test]
    async fn test_query_domain_full_and_verbose() {
        let (status, body) = get_json(
            create_test_app(),
            "/query_domain?domain=example.com&full=1&verbose",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["http://example.com/a"],
            json!([
                ["2015_27", {"crawl": "2015_27"}],
                ["2015_32", {"crawl": "2015_32"}]
            ])
        );
        assert!(body["time"].as_str().unwrap().ends_with('s'));
        // Three keys visited per crawl, three observations returned
        assert_eq!(body["skipped"], 3);
    }

    #[tokio::test]
    async fn test_query_domain_crawl_and_cap() {
        let (status, body) = get_json(
            create_test_app(),
            "/query_domain?domain=example.com&crawl=2015_27&max_results=1&full=1",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query_crawl"], "2015_27");
        assert_eq!(body["unique_urls"], json!(["http://example.com/a"]));
        assert_eq!(body["truncated"], true);
    }

    #[tokio::test]
    async fn test_query_domain_corrupt_range_is_incomplete() {
        let entries = vec![
            (
                key::encode("example", "http://example.com/a", "2015_27").unwrap(),
                b"not json".to_vec(),
            ),
            (
                key::encode("example", "http://example.com/b", "2015_27").unwrap(),
                b"{".to_vec(),
            ),
        ];
        let catalog =
            Catalog::from_stores(vec![Arc::new(MemoryStore::from_entries("2015_27", entries)) as StoreHandle])
                .unwrap();
        let engine = Arc::new(QueryEngine::new(Arc::new(catalog)));
        let app = build_router(AppState::new(engine, ApiConfig::default()));

        let (status, body) = get_json(app, "/query_domain?domain=example.com").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unique_urls"], json!([]));
        assert_eq!(body["malformed"], 2);
        assert_eq!(body["complete"], false);
    }

    #[tokio::test]
    async fn test_query_domain_exact() {
        let (_, body) = get_json(
            create_test_app(),
            "/query_domain?domain=example.com/b&exact",
        )
        .await;

        assert_eq!(body["unique_urls"], json!(["http://example.com/b"]));
        assert_eq!(body["db_key"], "example http://example.com/b ");
    }

    #[tokio::test]
    async fn test_query_domain_missing_domain() {
        let (status, body) = get_json(create_test_app(), "/query_domain").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "400 Bad Request");
        assert!(body["message"].as_str().unwrap().contains("domain"));
        assert!(body["traceback"].is_null());
        assert!(body["version"].as_str().unwrap().starts_with("crawlmeta/"));
    }

    #[tokio::test]
    async fn test_query_domain_bad_max_results() {
        let (status, _) = get_json(
            create_test_app(),
            "/query_domain?domain=example.com&max_results=lots",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_domain_unknown_crawl() {
        let (status, body) = get_json(
            create_test_app(),
            "/query_domain?domain=example.com&crawl=1999_01",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Unknown crawl: 1999_01");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = get_json(create_test_app(), "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "404 Not Found");
    }
}
