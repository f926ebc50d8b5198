//! Federated Range Query Engine
//!
//! Executes a domain query against every selected crawl store:
//! 1. Canonicalize the query into (domain, suffix, path)
//! 2. Seek each store to the start of the domain's key range
//! 3. Walk forward, filtering by suffix and path prefix
//! 4. Join the per-crawl scans and group matches by URI
//!
//! # Execution Pipeline
//!
//! ```text
//! Request → Plan → ┬ scan crawl A ┬ → Merge → Result
//!                  └ scan crawl B ┘
//! ```
//!
//! Each crawl is scanned on its own blocking task. The scans share one
//! budget holding the global result cap, claimed once per match. Taking
//! the last slot or passing the deadline raises a shared cancellation flag
//! that every scan checks before visiting the next key. A scan stopped by
//! the cap looks at that one key only to decide whether the result was
//! truncated.
//!
//! # Termination
//!
//! Keys are `<domain> <uri> <crawl>` in byte order, so a walk that reaches
//! a key of another domain has left the domain's range for good
//! (`past_domain_range`). With exact matching each store is seeked to the
//! full key of the target URI in that store's crawl. URIs may contain
//! spaces, so `<uri> <more> <crawl>` can sort before `<uri> <crawl>`; the
//! full-key seek steps over those, and the first other URI after it ends
//! the walk (`past_exact_uri`). Both predicates assume the index was
//! built with the same canonicalization used at query time.

use crate::query::error::{EngineResult, QueryError};
use crate::query::request::QueryRequest;
use crate::query::result::{CrawlObservation, QueryResult, ScanStats};
use crate::storage::{key, Catalog, CompositeKey, OrderedStore, ScanControl, StorageResult, StoreHandle};
use crate::uri::{canonicalize, with_default_scheme, UriComponents, UriError};
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine-wide defaults
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Result cap applied when a request does not set one
    pub max_results: usize,
    /// Bound on total scan time per request (`None` = unbounded)
    pub scan_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_results: 10_000,
            scan_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Federated query engine over an immutable crawl catalog
pub struct QueryEngine {
    catalog: Arc<Catalog>,
    config: EngineConfig,
}

impl QueryEngine {
    /// Create an engine with default limits
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a domain query
    pub async fn query(&self, request: QueryRequest) -> EngineResult<QueryResult> {
        let start = Instant::now();

        let plan = Arc::new(ScanPlan::build(&request)?);
        let selected = self.select_crawls(&request)?;

        let max_results = request.max_results.unwrap_or(self.config.max_results);
        let deadline = self.config.scan_timeout.map(|timeout| start + timeout);
        let budget = Arc::new(ScanBudget::new(max_results, deadline));

        let crawls: Vec<String> = selected.iter().map(|(crawl, _)| crawl.clone()).collect();
        let scans = selected.into_iter().map(|(crawl, store)| {
            let plan = Arc::clone(&plan);
            let budget = Arc::clone(&budget);
            tokio::task::spawn_blocking(move || scan_store(store.as_ref(), &crawl, &plan, &budget))
        });
        let outcomes = join_all(scans).await;

        let mut result = plan.empty_result(request.crawl.clone());

        for (crawl, outcome) in crawls.into_iter().zip(outcomes) {
            match outcome {
                Ok(Ok(scan)) => {
                    result.stats += scan.stats;
                    result.filtered_keys.extend(scan.filtered_keys);
                    for (uri, observation) in scan.matches {
                        result.insert(uri, CrawlObservation(crawl.clone(), observation));
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(crawl = %crawl, error = %e, "Crawl store unavailable, omitting its entries");
                    result.unavailable_crawls.push(crawl);
                }
                Err(e) => {
                    tracing::error!(crawl = %crawl, error = %e, "Scan task failed, omitting its entries");
                    result.unavailable_crawls.push(crawl);
                }
            }
        }

        result.truncated = budget.truncated.load(Ordering::SeqCst);
        result.timed_out = budget.timed_out.load(Ordering::SeqCst);
        if request.diagnostics {
            result.elapsed = Some(start.elapsed());
        }

        tracing::debug!(
            domain = %result.query_domain,
            urls = result.matches.len(),
            visited = result.stats.visited,
            matched = result.stats.matched,
            truncated = result.truncated,
            timed_out = result.timed_out,
            "Domain query finished"
        );

        Ok(result)
    }

    /// The requested crawl, or every registered crawl
    fn select_crawls(&self, request: &QueryRequest) -> EngineResult<Vec<(String, StoreHandle)>> {
        match request.crawl.as_deref().filter(|c| !c.is_empty()) {
            Some(crawl) => {
                let store = self
                    .catalog
                    .store_for(crawl)
                    .map_err(|_| QueryError::UnknownCrawl(crawl.to_string()))?;
                Ok(vec![(crawl.to_string(), store)])
            }
            None => Ok(self
                .catalog
                .iter()
                .map(|(crawl, store)| (crawl.clone(), Arc::clone(store)))
                .collect()),
        }
    }
}

/// Everything a single store walk needs to know
#[derive(Debug, Clone)]
struct ScanPlan {
    components: UriComponents,
    target_uri: String,
    seek_key: Vec<u8>,
    exact: bool,
    suffix: Option<String>,
    path_prefix: Option<String>,
}

impl ScanPlan {
    fn build(request: &QueryRequest) -> EngineResult<Self> {
        let raw = request.domain.trim();
        if raw.is_empty() {
            return Err(UriError::MalformedUri(request.domain.clone()).into());
        }

        let target_uri = with_default_scheme(raw);
        let components = canonicalize(&target_uri)?;

        if components.registrable_domain.is_empty() {
            return Err(QueryError::EmptyDomain(request.domain.clone()));
        }

        let suffix = pick_filter(
            request.suffix.as_deref(),
            request.inherit_filters,
            &components.public_suffix,
        );
        let path_prefix = pick_filter(
            request.path_prefix.as_deref(),
            request.inherit_filters,
            &components.path,
        );

        let seek = if request.exact {
            key::encode(&components.registrable_domain, &target_uri, "")
        } else {
            key::domain_prefix(&components.registrable_domain)
        };
        let seek_key = seek.map_err(|e| UriError::MalformedUri(e.to_string()))?;

        Ok(Self {
            components,
            target_uri,
            seek_key,
            exact: request.exact,
            suffix,
            path_prefix,
        })
    }

    fn domain(&self) -> &str {
        &self.components.registrable_domain
    }

    /// Where the walk over `crawl`'s store begins
    fn seek_for(&self, crawl: &str) -> StorageResult<Vec<u8>> {
        if self.exact {
            key::encode(self.domain(), &self.target_uri, crawl)
        } else {
            Ok(self.seek_key.clone())
        }
    }

    fn has_filters(&self) -> bool {
        self.suffix.is_some() || self.path_prefix.is_some()
    }

    /// Suffix and path-prefix filters, combined with AND
    fn accepts(&self, parts: &UriComponents) -> bool {
        if let Some(ref suffix) = self.suffix {
            if &parts.public_suffix != suffix {
                return false;
            }
        }
        if let Some(ref prefix) = self.path_prefix {
            if !parts.path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }

    fn empty_result(&self, crawl: Option<String>) -> QueryResult {
        QueryResult {
            query_domain: self.components.registrable_domain.clone(),
            query_suffix: self.components.public_suffix.clone(),
            query_path: self.components.path.clone(),
            query_crawl: crawl,
            target_uri: self.target_uri.clone(),
            seek_key: String::from_utf8_lossy(&self.seek_key).into_owned(),
            suffix_filter: self.suffix.clone(),
            path_filter: self.path_prefix.clone(),
            ..Default::default()
        }
    }
}

/// Explicit filter if given, else the derived value when inheriting
fn pick_filter(explicit: Option<&str>, inherit: bool, derived: &str) -> Option<String> {
    match explicit {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ if inherit && !derived.is_empty() => Some(derived.to_string()),
        _ => None,
    }
}

/// Limits shared by all scans of one request
struct ScanBudget {
    limit: usize,
    claimed: AtomicUsize,
    cancelled: AtomicBool,
    truncated: AtomicBool,
    timed_out: AtomicBool,
    deadline: Option<Instant>,
}

impl ScanBudget {
    fn new(limit: usize, deadline: Option<Instant>) -> Self {
        Self {
            limit,
            claimed: AtomicUsize::new(0),
            cancelled: AtomicBool::new(limit == 0),
            truncated: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
            deadline,
        }
    }

    /// Reserve one result slot
    ///
    /// Taking the last slot tells every scan to stop.
    fn claim(&self) -> bool {
        match self
            .claimed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.limit).then_some(n + 1)
            }) {
            Ok(previous) => {
                if previous + 1 >= self.limit {
                    self.cancelled.store(true, Ordering::SeqCst);
                }
                true
            }
            Err(_) => {
                self.truncated.store(true, Ordering::SeqCst);
                self.cancelled.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    /// Record that the cap left part of the queried range unvisited
    fn mark_truncated(&self) {
        self.truncated.store(true, Ordering::SeqCst);
    }

    fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    /// Return slots claimed by a scan whose entries are discarded
    fn release(&self, count: usize) {
        self.claimed.fetch_sub(count, Ordering::SeqCst);
    }

    /// Whether the scan should end before visiting another key
    fn exhausted(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.timed_out.store(true, Ordering::SeqCst);
                self.cancelled.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }
}

/// Matches and counters from one crawl store
#[derive(Debug, Default)]
struct CrawlScan {
    matches: Vec<(String, Value)>,
    filtered_keys: Vec<String>,
    stats: ScanStats,
}

/// The walk left the query domain's contiguous key range
fn past_domain_range(key: &CompositeKey, plan: &ScanPlan) -> bool {
    key.domain != plan.domain()
}

/// Exact matching is on and the walk moved past the target URI
fn past_exact_uri(key: &CompositeKey, plan: &ScanPlan) -> bool {
    plan.exact && key.uri != plan.target_uri
}

/// The raw key still belongs to the range the query walks
fn within_range(raw_key: &[u8], plan: &ScanPlan) -> bool {
    match key::decode(raw_key) {
        Ok(key) => !past_domain_range(&key, plan) && !past_exact_uri(&key, plan),
        Err(_) => false,
    }
}

/// Walk one store from the plan's seek key
///
/// A store error discards the whole contribution of this crawl and returns
/// its claimed slots to the budget.
fn scan_store(
    store: &dyn OrderedStore,
    crawl: &str,
    plan: &ScanPlan,
    budget: &ScanBudget,
) -> StorageResult<CrawlScan> {
    let mut scan = CrawlScan::default();

    if budget.exhausted() && budget.timed_out() {
        return Ok(scan);
    }

    let seek_key = plan.seek_for(crawl)?;
    let walked = store.scan_from(&seek_key, &mut |raw_key, raw_value| {
        if budget.exhausted() {
            if !budget.timed_out() && within_range(raw_key, plan) {
                budget.mark_truncated();
            }
            return ScanControl::Stop;
        }
        scan.stats.visited += 1;

        let key = match key::decode(raw_key) {
            Ok(key) => key,
            Err(e) => {
                scan.stats.malformed += 1;
                tracing::warn!(crawl = %crawl, error = %e, "Skipping malformed key");
                return ScanControl::Continue;
            }
        };

        if past_domain_range(&key, plan) {
            return ScanControl::Stop;
        }
        if past_exact_uri(&key, plan) {
            return ScanControl::Stop;
        }

        if key.crawl != crawl {
            scan.stats.malformed += 1;
            tracing::warn!(crawl = %crawl, key = %key, "Skipping key of a foreign crawl");
            return ScanControl::Continue;
        }

        if plan.has_filters() {
            let parts = match canonicalize(&key.uri) {
                Ok(parts) => parts,
                Err(e) => {
                    scan.stats.malformed += 1;
                    tracing::warn!(crawl = %crawl, error = %e, "Skipping key with unparsable uri");
                    return ScanControl::Continue;
                }
            };
            if !plan.accepts(&parts) {
                scan.stats.filtered += 1;
                scan.filtered_keys.push(key.to_string());
                return ScanControl::Continue;
            }
        }

        let observation: Value = match serde_json::from_slice(raw_value) {
            Ok(value) => value,
            Err(e) => {
                scan.stats.malformed += 1;
                tracing::warn!(crawl = %crawl, key = %key, error = %e, "Skipping undecodable observation");
                return ScanControl::Continue;
            }
        };

        if !budget.claim() {
            return ScanControl::Stop;
        }

        scan.stats.matched += 1;
        scan.matches.push((key.uri, observation));
        ScanControl::Continue
    });

    match walked {
        Ok(()) => Ok(scan),
        Err(e) => {
            budget.release(scan.stats.matched);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, RegistryResult, SqliteStore, StorageError};
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(domain: &str, uri: &str, crawl: &str, value: Value) -> (Vec<u8>, Vec<u8>) {
        (
            key::encode(domain, uri, crawl).unwrap(),
            serde_json::to_vec(&value).unwrap(),
        )
    }

    fn store(label: &str, entries: Vec<(Vec<u8>, Vec<u8>)>) -> StoreHandle {
        Arc::new(MemoryStore::from_entries(label, entries))
    }

    fn engine(stores: Vec<StoreHandle>) -> QueryEngine {
        let catalog = Catalog::from_stores(stores).unwrap();
        QueryEngine::new(Arc::new(catalog))
    }

    /// Entries for crawl `crawl` spread over several domains
    fn crawl_entries(crawl: &str) -> Vec<(Vec<u8>, Vec<u8>)> {
        vec![
            entry("exampl", "http://exampl.com/", crawl, json!({"n": 0})),
            entry("example", "http://aaa.example.com/", crawl, json!({"n": 1})),
            entry("example", "http://example.com/a", crawl, json!({"n": 2})),
            entry("example", "http://example.com/b", crawl, json!({"n": 3})),
            entry("example", "http://example.com/blog/1", crawl, json!({"n": 4})),
            entry("example", "http://example.org/", crawl, json!({"n": 5})),
            entry("example", "https://www.example.com/blog/2", crawl, json!({"n": 6})),
            entry("example-shop", "http://example-shop.com/", crawl, json!({"n": 7})),
            entry("other", "http://other.com/", crawl, json!({"n": 8})),
        ]
    }

    /// Store whose crawl id is discoverable but whose scans fail
    struct BrokenStore;

    impl OrderedStore for BrokenStore {
        fn location(&self) -> &str {
            "broken"
        }

        fn first_key(&self) -> StorageResult<Option<Vec<u8>>> {
            Ok(Some(key::encode("example", "http://example.com/", "broken").unwrap()))
        }

        fn last_key(&self) -> StorageResult<Option<Vec<u8>>> {
            self.first_key()
        }

        fn scan_from(
            &self,
            _start: &[u8],
            _visitor: &mut dyn FnMut(&[u8], &[u8]) -> ScanControl,
        ) -> StorageResult<()> {
            Err(StorageError::Backend("disk went away".to_string()))
        }
    }

    #[tokio::test]
    async fn test_worked_example() {
        let engine = engine(vec![store(
            "c1",
            vec![
                entry("example", "http://example.com/a", "c1", json!("v1")),
                entry("example", "http://example.com/b", "c1", json!("v2")),
                entry("other", "http://other.com/", "c1", json!("v3")),
            ],
        )]);

        let result = engine.query(QueryRequest::new("example.com")).await.unwrap();

        assert_eq!(
            result.unique_urls(),
            vec!["http://example.com/a", "http://example.com/b"]
        );
        assert_eq!(result.query_domain, "example");
        assert_eq!(result.query_path, "");
        assert_eq!(
            result.matches["http://example.com/a"],
            vec![CrawlObservation("c1".to_string(), json!("v1"))]
        );
        assert!(result.is_complete());
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_range_scan_is_complete_for_domain() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine
            .query(QueryRequest::new("example.com").inherit_filters(false))
            .await
            .unwrap();

        assert_eq!(
            result.unique_urls(),
            vec![
                "http://aaa.example.com/",
                "http://example.com/a",
                "http://example.com/b",
                "http://example.com/blog/1",
                "http://example.org/",
                "https://www.example.com/blog/2",
            ]
        );
        // The walk stops on the first key of `example-shop`
        assert_eq!(result.stats.visited, 7);
        assert_eq!(result.seek_key, "example ");
    }

    #[tokio::test]
    async fn test_inherited_suffix_filter() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine.query(QueryRequest::new("example.org")).await.unwrap();

        assert_eq!(result.unique_urls(), vec!["http://example.org/"]);
        assert_eq!(result.stats.filtered, 5);
        assert_eq!(result.filtered_keys.len(), 5);
        assert!(result
            .filtered_keys
            .contains(&"example http://example.com/a c1".to_string()));
        assert_eq!(result.suffix_filter.as_deref(), Some("org"));
    }

    #[tokio::test]
    async fn test_path_prefix_filter_composes_with_suffix() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine
            .query(QueryRequest::new("example.com/blog"))
            .await
            .unwrap();

        assert_eq!(
            result.unique_urls(),
            vec!["http://example.com/blog/1", "https://www.example.com/blog/2"]
        );
        assert_eq!(result.query_path, "/blog");

        for uri in result.unique_urls() {
            let parts = canonicalize(&uri).unwrap();
            assert_eq!(parts.public_suffix, "com");
            assert!(parts.path.starts_with("/blog"));
        }
    }

    #[tokio::test]
    async fn test_explicit_filters_override_derived() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine
            .query(QueryRequest::new("example.com").suffix("org"))
            .await
            .unwrap();
        assert_eq!(result.unique_urls(), vec!["http://example.org/"]);

        let result = engine
            .query(
                QueryRequest::new("example.com")
                    .inherit_filters(false)
                    .path_prefix("/b"),
            )
            .await
            .unwrap();
        assert_eq!(
            result.unique_urls(),
            vec!["http://example.com/b", "http://example.com/blog/1", "https://www.example.com/blog/2"]
        );
    }

    #[tokio::test]
    async fn test_exact_match_across_crawls() {
        let engine = engine(vec![
            store("c1", crawl_entries("c1")),
            store("c2", crawl_entries("c2")),
        ]);

        let result = engine
            .query(QueryRequest::new("example.com/a").exact(true))
            .await
            .unwrap();

        assert_eq!(result.unique_urls(), vec!["http://example.com/a"]);
        let crawls: Vec<&str> = result.matches["http://example.com/a"]
            .iter()
            .map(|o| o.crawl())
            .collect();
        assert_eq!(crawls, vec!["c1", "c2"]);
        // One match plus the key that ended the walk, per crawl
        assert_eq!(result.stats.visited, 4);
        assert_eq!(result.seek_key, "example http://example.com/a ");
    }

    #[tokio::test]
    async fn test_exact_match_with_space_extended_uri() {
        // `/a b c1` sorts before `/a c1`
        let engine = engine(vec![
            store(
                "c1",
                vec![
                    entry("example", "http://example.com/a", "c1", json!("plain")),
                    entry("example", "http://example.com/a b", "c1", json!("spaced")),
                ],
            ),
            store(
                "c2",
                vec![entry("example", "http://example.com/a b", "c2", json!("spaced"))],
            ),
        ]);

        let result = engine
            .query(QueryRequest::new("http://example.com/a").exact(true))
            .await
            .unwrap();

        assert_eq!(result.unique_urls(), vec!["http://example.com/a"]);
        assert_eq!(
            result.matches["http://example.com/a"],
            vec![CrawlObservation("c1".to_string(), json!("plain"))]
        );

        let spaced = engine
            .query(QueryRequest::new("http://example.com/a b").exact(true))
            .await
            .unwrap();
        assert_eq!(spaced.results_returned(), 2);
    }

    #[tokio::test]
    async fn test_exact_match_absent_uri() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine
            .query(QueryRequest::new("example.com/zzz").exact(true))
            .await
            .unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.stats.visited, 1);
    }

    #[tokio::test]
    async fn test_federation_merges_disjoint_crawls() {
        let engine = engine(vec![
            store(
                "c1",
                vec![entry("example", "http://example.com/a", "c1", json!({"status": 200}))],
            ),
            store(
                "c2",
                vec![
                    entry("example", "http://example.com/a", "c2", json!({"status": 404})),
                    entry("example", "http://example.com/new", "c2", json!({"status": 200})),
                ],
            ),
        ]);

        let result = engine.query(QueryRequest::new("example.com")).await.unwrap();

        assert_eq!(
            result.matches["http://example.com/a"],
            vec![
                CrawlObservation("c1".to_string(), json!({"status": 200})),
                CrawlObservation("c2".to_string(), json!({"status": 404})),
            ]
        );
        assert_eq!(result.unique_urls().len(), 2);
        assert_eq!(result.results_returned(), 3);
    }

    #[tokio::test]
    async fn test_crawl_restriction() {
        let engine = engine(vec![
            store("c1", crawl_entries("c1")),
            store("c2", crawl_entries("c2")),
        ]);

        let result = engine
            .query(QueryRequest::new("example.com").crawl("c2"))
            .await
            .unwrap();

        assert_eq!(result.query_crawl.as_deref(), Some("c2"));
        assert!(result
            .matches
            .values()
            .flatten()
            .all(|o| o.crawl() == "c2"));
    }

    #[tokio::test]
    async fn test_unknown_crawl() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine.query(QueryRequest::new("example.com").crawl("c9")).await;
        assert!(matches!(result, Err(QueryError::UnknownCrawl(ref c)) if c == "c9"));
    }

    #[tokio::test]
    async fn test_cap_is_global_across_crawls() {
        let engine = engine(vec![
            store("c1", crawl_entries("c1")),
            store("c2", crawl_entries("c2")),
            store("c3", crawl_entries("c3")),
        ]);

        for cap in [0, 1, 3, 7] {
            let result = engine
                .query(
                    QueryRequest::new("example.com")
                        .inherit_filters(false)
                        .max_results(cap),
                )
                .await
                .unwrap();

            assert!(result.results_returned() <= cap);
            assert_eq!(result.results_returned(), result.stats.matched);
            assert!(result.truncated, "cap {} should truncate 18 matches", cap);
        }
    }

    #[tokio::test]
    async fn test_cap_not_reached() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let result = engine
            .query(
                QueryRequest::new("example.com")
                    .inherit_filters(false)
                    .max_results(6),
            )
            .await
            .unwrap();

        assert_eq!(result.results_returned(), 6);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_cap_stops_scan_once_reached() {
        let mut entries = vec![entry("example", "http://example.com/", "c1", json!(0))];
        entries.extend((0..500).map(|i| {
            entry("example", &format!("http://example.org/{:04}", i), "c1", json!(i))
        }));
        let engine = engine(vec![store("c1", entries)]);

        let result = engine
            .query(QueryRequest::new("example.com").max_results(1))
            .await
            .unwrap();

        assert_eq!(result.unique_urls(), vec!["http://example.com/"]);
        assert_eq!(result.stats.visited, 1);
        assert_eq!(result.stats.filtered, 0);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_cap_reached_at_range_end_is_not_truncated() {
        let engine = engine(vec![store(
            "c1",
            vec![
                entry("example", "http://example.com/a", "c1", json!(1)),
                entry("other", "http://other.com/", "c1", json!(2)),
            ],
        )]);

        let result = engine
            .query(QueryRequest::new("example.com").max_results(1))
            .await
            .unwrap();

        assert_eq!(result.results_returned(), 1);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_malformed_only_range_is_incomplete() {
        let engine = engine(vec![store(
            "c1",
            vec![
                (
                    key::encode("example", "http://example.com/a", "c1").unwrap(),
                    b"not json".to_vec(),
                ),
                (
                    key::encode("example", "http://example.com/b", "c1").unwrap(),
                    b"{".to_vec(),
                ),
            ],
        )]);

        let result = engine.query(QueryRequest::new("example.com")).await.unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.stats.malformed, 2);
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let mut entries = crawl_entries("c1");
        entries.push((b"example garbage".to_vec(), b"{}".to_vec()));
        entries.push(entry("example", "http://example.com/c", "c1", json!(null)));
        entries.push((
            key::encode("example", "http://example.com/d", "c1").unwrap(),
            b"not json".to_vec(),
        ));
        entries.push(entry("example", "http://example.com/e", "c1", json!(1)));
        let engine = engine(vec![store("c1", entries)]);

        let result = engine
            .query(QueryRequest::new("example.com").inherit_filters(false))
            .await
            .unwrap();

        assert_eq!(result.stats.malformed, 2);
        assert!(result.matches.contains_key("http://example.com/c"));
        assert!(!result.matches.contains_key("http://example.com/d"));
        assert!(result.matches.contains_key("http://example.com/e"));
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_foreign_crawl_key_skipped() {
        let mut entries = crawl_entries("c1");
        entries.push(entry("example", "http://example.com/x", "c2", json!(1)));
        let engine = engine(vec![store("c1", entries)]);

        let result = engine
            .query(QueryRequest::new("example.com").inherit_filters(false))
            .await
            .unwrap();

        assert!(!result.matches.contains_key("http://example.com/x"));
        assert_eq!(result.stats.malformed, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_yields_partial_result() {
        let engine = engine(vec![store("c1", crawl_entries("c1")), Arc::new(BrokenStore) as StoreHandle]);

        let result = engine.query(QueryRequest::new("example.com")).await.unwrap();

        assert_eq!(result.unavailable_crawls, vec!["broken"]);
        assert!(!result.is_complete());
        assert!(result.matches.contains_key("http://example.com/a"));
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_result() {
        let catalog = Arc::new(Catalog::from_stores(vec![store("c1", crawl_entries("c1"))]).unwrap());
        let engine = QueryEngine::with_config(
            catalog,
            EngineConfig {
                max_results: 100,
                scan_timeout: Some(Duration::ZERO),
            },
        );

        let result = engine.query(QueryRequest::new("example.com")).await.unwrap();

        assert!(result.timed_out);
        assert!(!result.is_complete());
        assert!(result.matches.is_empty());
    }

    #[tokio::test]
    async fn test_diagnostics_elapsed() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        let plain = engine.query(QueryRequest::new("example.com")).await.unwrap();
        assert!(plain.elapsed.is_none());

        let verbose = engine
            .query(QueryRequest::new("example.com").diagnostics(true))
            .await
            .unwrap();
        assert!(verbose.elapsed.is_some());
    }

    #[tokio::test]
    async fn test_request_errors() {
        let engine = engine(vec![store("c1", crawl_entries("c1"))]);

        assert!(matches!(
            engine.query(QueryRequest::new("")).await,
            Err(QueryError::MalformedUri(_))
        ));
        assert!(matches!(
            engine.query(QueryRequest::new("co.uk")).await,
            Err(QueryError::EmptyDomain(_))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_federation() -> RegistryResult<()> {
        let dir = tempdir().unwrap();
        let a = dir.path().join("c1.db");
        let b = dir.path().join("c2.db");
        SqliteStore::create(&a, crawl_entries("c1")).unwrap();
        SqliteStore::create(&b, crawl_entries("c2")).unwrap();

        let engine = QueryEngine::new(Arc::new(Catalog::register(&[&a, &b])?));
        let result = engine.query(QueryRequest::new("example.com/b")).await.unwrap();

        assert_eq!(
            result.unique_urls(),
            vec![
                "http://example.com/b",
                "http://example.com/blog/1",
                "https://www.example.com/blog/2",
            ]
        );
        assert_eq!(result.matches["http://example.com/b"].len(), 2);
        Ok(())
    }
}
