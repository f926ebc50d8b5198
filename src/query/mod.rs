//! Crawlmeta Query Engine
//!
//! Answers "what do the crawls know about this domain?":
//!
//! - **Request**: Query string, crawl restriction, filters and limits
//! - **Engine**: Plans the seek, fans out one scan per crawl, merges
//! - **Result**: URI → per-crawl observations plus scan diagnostics
//!
//! # Matching
//!
//! ```text
//! query "www.example.com/blog"
//!   → domain "example", suffix "com", path "/blog"
//!   → every key "example <uri> <crawl>" whose uri has suffix "com"
//!     and a path starting with "/blog"
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use crawlmeta::query::{QueryEngine, QueryRequest};
//! use crawlmeta::storage::Catalog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(Catalog::register(&["/data/crawl-2015-27.db"])?);
//!     let engine = QueryEngine::new(catalog);
//!
//!     let result = engine
//!         .query(QueryRequest::new("example.com").max_results(100))
//!         .await?;
//!
//!     for uri in result.unique_urls() {
//!         println!("{}", uri);
//!     }
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod request;
mod result;

pub use engine::{EngineConfig, QueryEngine};
pub use error::{EngineResult, QueryError};
pub use request::QueryRequest;
pub use result::{CrawlObservation, QueryResult, ScanStats};
