//! Domain query request
//!
//! Built with chained setters, in the same style as the rest of the crate:
//!
//! ```rust
//! use crawlmeta::query::QueryRequest;
//!
//! let request = QueryRequest::new("example.com/blog")
//!     .crawl("2015_27")
//!     .max_results(100)
//!     .diagnostics(true);
//! assert_eq!(request.max_results, Some(100));
//! ```

/// What to look up and how to bound the lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Raw query string; a default scheme is added when missing
    pub domain: String,
    /// Restrict to one crawl; `None` queries every registered crawl
    pub crawl: Option<String>,
    /// Keep only entries whose public suffix equals this value
    pub suffix: Option<String>,
    /// Keep only entries whose path+query starts with this value
    pub path_prefix: Option<String>,
    /// Fall back to the suffix and path derived from `domain` when no
    /// explicit filter is given
    pub inherit_filters: bool,
    /// Match only entries whose URI equals the normalized query string
    pub exact: bool,
    /// Global cap across all crawls; `None` uses the engine default
    pub max_results: Option<usize>,
    /// Record elapsed time
    pub diagnostics: bool,
}

impl QueryRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            crawl: None,
            suffix: None,
            path_prefix: None,
            inherit_filters: true,
            exact: false,
            max_results: None,
            diagnostics: false,
        }
    }

    /// Restrict to a single crawl (an empty id means all crawls)
    pub fn crawl(mut self, crawl: impl Into<String>) -> Self {
        let crawl = crawl.into();
        self.crawl = if crawl.is_empty() { None } else { Some(crawl) };
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn inherit_filters(mut self, inherit: bool) -> Self {
        self.inherit_filters = inherit;
        self
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
