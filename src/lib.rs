//! # Crawlmeta
//!
//! Crawl Metadata Server - federated domain lookups over immutable,
//! ordered web-crawl snapshots.
//!
//! ## Features
//!
//! - **Range scans**: entries are keyed `<domain> <uri> <crawl>`, so every
//!   observation of a domain is one contiguous ordered range
//! - **Federation**: one read-only store per crawl, queried concurrently
//!   and merged by URI
//! - **Bounded queries**: a global result cap and a scan deadline, with
//!   partial-result diagnostics
//! - **HTTP API**: `/crawls` and `/query_domain` with Axum
//!
//! ## Modules
//!
//! - [`uri`]: URI canonicalization into domain, suffix and path
//! - [`storage`]: Key codec, ordered stores and the crawl catalog
//! - [`query`]: Federated range query engine
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML and environment configuration
//! - [`logging`]: Subscriber setup
//!
//! ## Quick Start
//!
//! ```rust
//! use crawlmeta::query::{QueryEngine, QueryRequest};
//! use crawlmeta::storage::{key, Catalog, MemoryStore, StoreHandle};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: StoreHandle = Arc::new(MemoryStore::from_entries(
//!         "demo",
//!         vec![
//!             (key::encode("example", "http://example.com/a", "2015_27")?, b"{\"status\":200}".to_vec()),
//!             (key::encode("other", "http://other.com/", "2015_27")?, b"{}".to_vec()),
//!         ],
//!     ));
//!
//!     let engine = QueryEngine::new(Arc::new(Catalog::from_stores(vec![store])?));
//!     let result = engine.query(QueryRequest::new("example.com")).await?;
//!
//!     assert_eq!(result.unique_urls(), vec!["http://example.com/a"]);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod logging;
pub mod query;
pub mod storage;
pub mod uri;

// Re-export top-level types for convenience
pub use storage::{
    Catalog, CompositeKey, MemoryStore, OrderedStore, RegistryError, ScanControl, SqliteStore,
    StorageError, StorageResult, StoreHandle,
};

pub use uri::{canonicalize, UriComponents, UriError};

pub use query::{
    CrawlObservation, EngineConfig, QueryEngine, QueryError, QueryRequest, QueryResult, ScanStats,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};

/// `crawlmeta/<version>`, reported in error envelopes
pub fn version_string() -> String {
    format!("crawlmeta/{}", env!("CARGO_PKG_VERSION"))
}
