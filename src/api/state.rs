//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::api::error::{ApiError, ApiResult};
use crate::query::QueryEngine;
use crate::storage::Catalog;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Query engine over the registered crawls
    pub engine: Arc<QueryEngine>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Bounds queries in flight and waiting
    pub admission: Arc<Admission>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<QueryEngine>, config: ApiConfig) -> Self {
        let admission = Admission::new(config.worker_threads, config.queue_depth);
        Self {
            engine,
            config: Arc::new(config),
            admission: Arc::new(admission),
            start_time: Instant::now(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.engine.catalog()
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Queries allowed to run at once
    pub worker_threads: usize,
    /// Queries allowed to wait for a slot before the server sheds load
    pub queue_depth: usize,
    /// Pretty-print every response
    pub pretty: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            worker_threads: 8,
            queue_depth: 1000,
            pretty: false,
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Admission control for query handlers
///
/// At most `slots` queries run; at most `queue_depth` more wait. Anything
/// beyond that is rejected with [`ApiError::Overloaded`].
#[derive(Debug)]
pub struct Admission {
    slots: Arc<Semaphore>,
    waiting: AtomicUsize,
    queue_depth: usize,
}

impl Admission {
    pub fn new(slots: usize, queue_depth: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(slots.max(1))),
            waiting: AtomicUsize::new(0),
            queue_depth,
        }
    }

    /// Take a slot, waiting if the queue has room
    pub async fn admit(&self) -> ApiResult<OwnedSemaphorePermit> {
        if let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() {
            return Ok(permit);
        }

        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _waiting = WaitingGuard(&self.waiting);

        if queued >= self.queue_depth {
            return Err(ApiError::Overloaded(format!(
                "{} queries already waiting",
                queued
            )));
        }

        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Internal("admission control closed".to_string()))
    }

    /// Queries currently waiting for a slot
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

/// Leaves the wait queue on drop, including when the request is cancelled
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
