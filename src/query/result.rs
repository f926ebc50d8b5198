//! Query results and scan diagnostics

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::time::Duration;

/// One observation of a URI, tagged with the crawl it came from
///
/// Serializes as a two-element array `[crawl, observation]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlObservation(pub String, pub Value);

impl CrawlObservation {
    pub fn crawl(&self) -> &str {
        &self.0
    }

    pub fn observation(&self) -> &Value {
        &self.1
    }
}

/// Counters accumulated while walking stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Keys visited, matched or not
    pub visited: usize,
    /// Entries added to the result
    pub matched: usize,
    /// In-range keys rejected by the suffix or path filter
    pub filtered: usize,
    /// Undecodable keys or values, and keys of a foreign crawl
    pub malformed: usize,
}

impl ScanStats {
    /// Visited keys that did not make it into the result
    pub fn skipped(&self) -> usize {
        self.visited.saturating_sub(self.matched)
    }
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.visited += other.visited;
        self.matched += other.matched;
        self.filtered += other.filtered;
        self.malformed += other.malformed;
    }
}

/// Outcome of a federated domain query
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Registrable domain label being matched
    pub query_domain: String,
    /// Public suffix derived from the query
    pub query_suffix: String,
    /// Path+query derived from the query
    pub query_path: String,
    /// Crawl restriction, if any
    pub query_crawl: Option<String>,
    /// Query string after default-scheme normalization
    pub target_uri: String,
    /// Seek key the scans started from
    pub seek_key: String,
    /// Suffix filter in effect
    pub suffix_filter: Option<String>,
    /// Path-prefix filter in effect
    pub path_filter: Option<String>,
    /// Matched URI → observations, in crawl order
    pub matches: BTreeMap<String, Vec<CrawlObservation>>,
    /// Keys rejected by the suffix or path filter
    pub filtered_keys: Vec<String>,
    pub stats: ScanStats,
    /// Crawls whose store failed; their entries are missing
    pub unavailable_crawls: Vec<String>,
    /// The result cap stopped the scan while matches remained
    pub truncated: bool,
    /// The scan deadline expired
    pub timed_out: bool,
    /// Wall-clock time, recorded when diagnostics were requested
    pub elapsed: Option<Duration>,
}

impl QueryResult {
    /// Distinct matched URIs, sorted
    pub fn unique_urls(&self) -> Vec<String> {
        self.matches.keys().cloned().collect()
    }

    /// Number of (crawl, observation) entries returned
    pub fn results_returned(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    /// Every selected crawl was scanned to its end condition
    ///
    /// A capped result is still complete in this sense; see `truncated`.
    /// An empty result is incomplete when malformed entries were skipped.
    pub fn is_complete(&self) -> bool {
        !self.timed_out
            && self.unavailable_crawls.is_empty()
            && !(self.matches.is_empty() && self.stats.malformed > 0)
    }

    pub(crate) fn insert(&mut self, uri: String, observation: CrawlObservation) {
        self.matches.entry(uri).or_default().push(observation);
    }
}
