//! Crawl Snapshot Storage
//!
//! This module provides read access to immutable crawl snapshots:
//!
//! - **key**: Composite `<domain> <uri> <crawl>` key codec
//! - **store**: The ordered store interface (first key, seek, forward walk)
//! - **sqlite**: Single-file SQLite snapshot, opened read-only
//! - **memory**: In-memory snapshot for tests and embedding
//! - **registry**: Startup catalog of crawl id → store
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Startup:
//!   Locations → open read-only → first key → crawl id → Catalog
//!
//! Read Path:
//!   Seek key → ordered walk → decode key → (domain, uri, crawl) + value
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use crawlmeta::storage::Catalog;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::register(&["/data/crawl-2015-27.db", "/data/crawl-2015-32.db"])?;
//!
//!     for crawl in catalog.crawl_ids() {
//!         println!("serving crawl {}", crawl);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod key;
pub mod memory;
pub mod registry;
pub mod sqlite;
pub mod store;

// Re-export commonly used types
pub use error::{RegistryError, RegistryResult, StorageError, StorageResult};
pub use key::{decode, domain_prefix, encode, CompositeKey};
pub use memory::MemoryStore;
pub use registry::{Catalog, StoreHandle};
pub use sqlite::SqliteStore;
pub use store::{OrderedStore, ScanControl};
