//! Storage layer error types
//!
//! Defines the errors raised by the key codec, the ordered stores and the
//! store registry.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading a crawl store
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// A key does not have the `<domain> <uri> <crawl>` shape
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// The location exists but is not a crawl store
    #[error("Invalid store at {location}: {reason}")]
    InvalidStore { location: String, reason: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while building the crawl catalog at startup
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A store could not be opened or read
    #[error("Cannot open store {location}: {source}")]
    Store {
        location: String,
        #[source]
        source: StorageError,
    },

    /// A store has no entries, so its crawl id cannot be discovered
    #[error("Store {0} is empty, cannot discover its crawl id")]
    EmptyStore(String),

    /// The first key of a store does not decode
    #[error("Store {location} starts with a malformed key: {key}")]
    MalformedKey { location: String, key: String },

    /// Two stores report the same crawl id
    #[error("Multiple stores for crawl {crawl}: {first} and {second}")]
    DuplicateCrawl {
        crawl: String,
        first: String,
        second: String,
    },

    /// First and last keys of a store carry different crawl ids
    #[error("Store {location} mixes crawls {first} and {last}")]
    MixedCrawls {
        location: String,
        first: String,
        last: String,
    },

    /// Requested crawl id is not registered
    #[error("Unknown crawl: {0}")]
    UnknownCrawl(String),
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    pub(crate) fn store(location: impl Into<String>, source: StorageError) -> Self {
        RegistryError::Store {
            location: location.into(),
            source,
        }
    }
}

/// Render a path the way registry errors and logs show it
pub(crate) fn display_location(path: &Path) -> String {
    path.display().to_string()
}
