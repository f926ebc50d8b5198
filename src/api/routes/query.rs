//! Query Routes
//!
//! - GET /query_domain - Federated domain lookup across crawls

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;

use crate::api::dto::{QueryDomainParams, QueryDomainResponse};
use crate::api::error::ApiResult;
use crate::api::response::json_response;
use crate::api::routes::params;
use crate::api::state::AppState;
use crate::query::QueryRequest;

/// GET /query_domain
///
/// Look up every observation of a domain, optionally restricted to one
/// crawl, with `full=1` returning the observations themselves.
pub async fn query_domain(
    State(state): State<Arc<AppState>>,
    query: Result<Query<QueryDomainParams>, QueryRejection>,
) -> ApiResult<Response> {
    let params = params(query)?;
    let request = build_request(&params)?;
    let full = params.full()?;
    let pretty = state.config.pretty || params.pretty()?;
    let verbose = params.verbose();

    let _permit = state.admission.admit().await?;

    let result = state.engine.query(request).await?;

    tracing::info!(
        domain = %result.query_domain,
        crawl = result.query_crawl.as_deref().unwrap_or("*"),
        urls = result.matches.len(),
        complete = result.is_complete(),
        "Served domain query"
    );

    let body = QueryDomainResponse::from_result(result, full, verbose);
    Ok(json_response(StatusCode::OK, &body, pretty))
}

/// Translate query-string parameters into an engine request
fn build_request(params: &QueryDomainParams) -> ApiResult<QueryRequest> {
    let mut request = QueryRequest::new(params.domain()?)
        .exact(params.exact())
        .diagnostics(params.verbose());

    if let Some(ref crawl) = params.crawl {
        request = request.crawl(crawl.trim());
    }
    if let Some(max_results) = params.max_results()? {
        request = request.max_results(max_results);
    }
    if let Some(ref suffix) = params.suffix {
        request = request.suffix(suffix.trim());
    }
    if let Some(ref path) = params.path {
        request = request.path_prefix(path.trim());
    }

    Ok(request)
}
