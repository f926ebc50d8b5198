//! Composite key codec
//!
//! Every entry of a crawl store is keyed by
//!
//! ```text
//! <registrable domain> SP <full uri> SP <crawl id>
//! ```
//!
//! Byte-lexicographic order over this layout puts all entries of a domain
//! in one contiguous range (the domain comes first and the separator sorts
//! below every character a host label may contain), and orders entries of
//! a domain by full URI. Entries for one URI across crawls are adjacent.
//!
//! Range scans rely on that order to stop at the first key of another
//! domain. It holds only if the index builder produced the domain label
//! with the same canonicalization as [`crate::uri::canonicalize`].

use crate::storage::error::{StorageError, StorageResult};
use std::fmt;

/// Separator between key segments
pub const SEPARATOR: u8 = b' ';

/// Decoded composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub domain: String,
    pub uri: String,
    pub crawl: String,
}

impl CompositeKey {
    pub fn new(
        domain: impl Into<String>,
        uri: impl Into<String>,
        crawl: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            uri: uri.into(),
            crawl: crawl.into(),
        }
    }

    /// Serialize to the on-disk byte form
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        encode(&self.domain, &self.uri, &self.crawl)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.domain, self.uri, self.crawl)
    }
}

/// Build the key for `(domain, uri, crawl)`
///
/// An empty crawl id yields a key that sorts before every real entry for
/// the same URI, which is what a seek needs.
pub fn encode(domain: &str, uri: &str, crawl: &str) -> StorageResult<Vec<u8>> {
    if domain.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::MalformedKey(format!(
            "domain segment contains the separator: {:?}",
            domain
        )));
    }
    if crawl.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::MalformedKey(format!(
            "crawl segment contains the separator: {:?}",
            crawl
        )));
    }

    let mut key = Vec::with_capacity(domain.len() + uri.len() + crawl.len() + 2);
    key.extend_from_slice(domain.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(uri.as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(crawl.as_bytes());
    Ok(key)
}

/// Smallest key of the range holding every entry for `domain`
pub fn domain_prefix(domain: &str) -> StorageResult<Vec<u8>> {
    if domain.as_bytes().contains(&SEPARATOR) {
        return Err(StorageError::MalformedKey(format!(
            "domain segment contains the separator: {:?}",
            domain
        )));
    }

    let mut key = Vec::with_capacity(domain.len() + 1);
    key.extend_from_slice(domain.as_bytes());
    key.push(SEPARATOR);
    Ok(key)
}

/// Split a stored key into its segments
///
/// The domain ends at the first separator and the crawl id starts after the
/// last one, so a URI containing spaces is recovered intact.
pub fn decode(bytes: &[u8]) -> StorageResult<CompositeKey> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| StorageError::MalformedKey(String::from_utf8_lossy(bytes).into_owned()))?;

    let malformed = || StorageError::MalformedKey(text.to_string());

    let (domain, rest) = text.split_once(' ').ok_or_else(malformed)?;
    let (uri, crawl) = rest.rsplit_once(' ').ok_or_else(malformed)?;

    Ok(CompositeKey::new(domain, uri, crawl))
}
