//! Data Transfer Objects
//!
//! Query-string parameters and JSON bodies for the API endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::error::{ApiError, ApiResult};
use crate::query::{CrawlObservation, QueryResult};

// ============================================
// PARAMETER PARSING
// ============================================

/// Parse a `0|1` style switch; absent means `false`
///
/// Accepts integers (`> 0` is on) and the usual boolean words.
pub fn parse_switch(name: &str, value: Option<&str>) -> ApiResult<bool> {
    let value = match value {
        None => return Ok(false),
        Some(v) => v.trim(),
    };

    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "off" => Ok(false),
        "true" | "yes" | "on" => Ok(true),
        other => other
            .parse::<i64>()
            .map(|n| n > 0)
            .map_err(|_| ApiError::Validation(format!("Invalid value for {}: {}", name, value))),
    }
}

// ============================================
// CRAWLS DTOs
// ============================================

/// `GET /crawls` parameters
#[derive(Debug, Default, Deserialize)]
pub struct CrawlsParams {
    pub pretty: Option<String>,
}

/// `GET /crawls` response
#[derive(Debug, Serialize)]
pub struct CrawlsResponse {
    /// Registered crawl ids, sorted
    pub crawls: Vec<String>,
}

// ============================================
// QUERY DTOs
// ============================================

/// `GET /query_domain` parameters
///
/// Every field is read as a string and validated by hand so that bad input
/// gets the JSON error envelope. `exact` and `verbose` are presence flags.
#[derive(Debug, Default, Deserialize)]
pub struct QueryDomainParams {
    pub domain: Option<String>,
    pub crawl: Option<String>,
    pub full: Option<String>,
    pub exact: Option<String>,
    pub max_results: Option<String>,
    pub pretty: Option<String>,
    pub verbose: Option<String>,
    /// Explicit public-suffix filter
    pub suffix: Option<String>,
    /// Explicit path-prefix filter
    pub path: Option<String>,
}

impl QueryDomainParams {
    /// Required, non-blank `domain`
    pub fn domain(&self) -> ApiResult<&str> {
        match self.domain.as_deref().map(str::trim) {
            Some(domain) if !domain.is_empty() => Ok(domain),
            _ => Err(ApiError::Validation(
                "Missing required parameter: domain".to_string(),
            )),
        }
    }

    pub fn max_results(&self) -> ApiResult<Option<usize>> {
        match self.max_results.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<usize>().map(Some).map_err(|_| {
                ApiError::Validation(format!("Invalid value for max_results: {}", raw))
            }),
        }
    }

    pub fn full(&self) -> ApiResult<bool> {
        parse_switch("full", self.full.as_deref())
    }

    pub fn pretty(&self) -> ApiResult<bool> {
        parse_switch("pretty", self.pretty.as_deref())
    }

    pub fn exact(&self) -> bool {
        self.exact.is_some()
    }

    pub fn verbose(&self) -> bool {
        self.verbose.is_some()
    }
}

/// `GET /query_domain` response
#[derive(Debug, Serialize)]
pub struct QueryDomainResponse {
    pub query_domain: String,
    /// Requested crawl, empty when all crawls were queried
    pub query_crawl: String,
    pub query_path: String,
    /// Key the store scans started from
    pub db_key: String,
    /// In-range keys rejected by the suffix or path filter
    pub skipped_keys: Vec<String>,
    /// Matched URIs, sorted
    pub unique_urls: Vec<String>,
    /// URI → `[crawl, observation]` pairs (`full=1` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, Vec<CrawlObservation>>>,
    /// Wall-clock time as `"%.2fs"` (`verbose` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Keys visited but not returned (`verbose` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,
    /// Undecodable or foreign-crawl entries skipped in the range
    pub malformed: usize,
    pub complete: bool,
    pub truncated: bool,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable_crawls: Vec<String>,
}

impl QueryDomainResponse {
    pub fn from_result(result: QueryResult, full: bool, verbose: bool) -> Self {
        let complete = result.is_complete();
        let unique_urls = result.unique_urls();
        let skipped = result.stats.skipped();
        let time = result
            .elapsed
            .map(|elapsed| format!("{:.2}s", elapsed.as_secs_f64()));

        Self {
            query_domain: result.query_domain,
            query_crawl: result.query_crawl.unwrap_or_default(),
            query_path: result.query_path,
            db_key: result.seek_key,
            skipped_keys: result.filtered_keys,
            unique_urls,
            data: full.then_some(result.matches),
            time: if verbose { time } else { None },
            skipped: verbose.then_some(skipped),
            malformed: result.stats.malformed,
            complete,
            truncated: result.truncated,
            timed_out: result.timed_out,
            unavailable_crawls: result.unavailable_crawls,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Per-crawl store status
#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub location: String,
    /// "ok" or the error message
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded, unhealthy
    pub status: String,
    /// Crawl id → store status
    pub crawls: BTreeMap<String, StoreHealth>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

// ============================================
// ERROR DTOs
// ============================================

/// Error envelope shared by every failing response
///
/// Fields are in alphabetical order.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    /// HTTP status line, e.g. `"404 Not Found"`
    pub status: String,
    /// Error source chain; only for server-side faults
    pub traceback: Option<String>,
    /// `crawlmeta/<version>`
    pub version: String,
}
