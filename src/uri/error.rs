//! URI error types

use thiserror::Error;

/// Errors raised while canonicalizing a URI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// No host could be identified, even after inserting a default scheme
    #[error("Cannot parse uri: {0}")]
    MalformedUri(String),
}

/// Result type alias for URI operations
pub type UriResult<T> = Result<T, UriError>;
