//! Query error types
//!
//! Only request-level problems are errors. Per-key and per-store failures
//! during a scan are absorbed into the result's diagnostics.

use crate::uri::UriError;
use thiserror::Error;

/// Errors that fail a whole query
#[derive(Error, Debug)]
pub enum QueryError {
    /// The query domain cannot be parsed
    #[error(transparent)]
    MalformedUri(#[from] UriError),

    /// The query canonicalizes to an empty registrable domain (e.g. `co.uk`)
    #[error("Query has no registrable domain: {0}")]
    EmptyDomain(String),

    /// Requested crawl is not registered
    #[error("Unknown crawl: {0}")]
    UnknownCrawl(String),
}

/// Result type for query operations
pub type EngineResult<T> = Result<T, QueryError>;
