//! URI Canonicalization
//!
//! Turns an arbitrary input string into a comparable
//! (registrable domain, public suffix, path+query) triple.
//!
//! The same canonical form must be produced when a crawl index is built
//! and when it is queried: keys carry the registrable domain label as
//! produced here, and range scans stop on the first label mismatch.
//!
//! # Example
//!
//! ```rust
//! use crawlmeta::uri::canonicalize;
//!
//! let parts = canonicalize("www.example.co.uk/news?page=2").unwrap();
//! assert_eq!(parts.registrable_domain, "example");
//! assert_eq!(parts.public_suffix, "co.uk");
//! assert_eq!(parts.path, "/news?page=2");
//! ```

mod canonical;
mod error;

pub use canonical::{canonicalize, with_default_scheme, UriComponents, DEFAULT_SCHEME};
pub use error::{UriError, UriResult};
