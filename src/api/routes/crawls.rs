//! Crawl Routes
//!
//! - GET /crawls - Registered crawl ids

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;

use crate::api::dto::{parse_switch, CrawlsParams, CrawlsResponse};
use crate::api::error::ApiResult;
use crate::api::response::json_response;
use crate::api::routes::params;
use crate::api::state::AppState;

/// GET /crawls
///
/// List the registered crawl ids in sorted order.
pub async fn list_crawls(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CrawlsParams>, QueryRejection>,
) -> ApiResult<Response> {
    let params = params(query)?;
    let pretty = state.config.pretty || parse_switch("pretty", params.pretty.as_deref())?;

    let body = CrawlsResponse {
        crawls: state.catalog().crawl_ids(),
    };

    Ok(json_response(StatusCode::OK, &body, pretty))
}
