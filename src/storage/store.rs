//! Ordered store interface
//!
//! The only primitives the query engine needs from a crawl snapshot:
//! read the first/last key, and walk forward from a seek position in byte
//! order. Implementations are read-only and shared across requests, so
//! each scan creates its own iteration context.

use crate::storage::error::StorageResult;

/// Returned by a scan visitor to continue or end the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

/// A read-only key-value store iterated in byte-lexicographic key order
pub trait OrderedStore: Send + Sync {
    /// Human-readable location (path or label) for logs and errors
    fn location(&self) -> &str;

    /// Smallest key in the store, `None` when empty
    fn first_key(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Largest key in the store, `None` when empty
    fn last_key(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Visit entries with key >= `start` in ascending order until the
    /// visitor returns [`ScanControl::Stop`] or the store is exhausted
    fn scan_from(
        &self,
        start: &[u8],
        visitor: &mut dyn FnMut(&[u8], &[u8]) -> ScanControl,
    ) -> StorageResult<()>;
}
