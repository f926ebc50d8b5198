//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides; the
//! server binary applies command-line overrides last.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::query::EngineConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub stores: StoresConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Runtime worker threads, also the number of queries run at once
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Queries allowed to wait before the server answers 503
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Pretty-print every response
    #[serde(default)]
    pub pretty: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_worker_threads() -> usize {
    8
}

fn default_queue_depth() -> usize {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: default_worker_threads(),
            queue_depth: default_queue_depth(),
            pretty: false,
        }
    }
}

/// Query engine limits
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Result cap when a request sets none
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Scan deadline per request; 0 disables it
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_ms: u64,
}

fn default_max_results() -> usize {
    10_000
}

fn default_scan_timeout() -> u64 {
    30_000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            scan_timeout_ms: default_scan_timeout(),
        }
    }
}

/// Crawl store locations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoresConfig {
    #[serde(default)]
    pub locations: Vec<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    /// Write `<prefix>.access.log` and `<prefix>.error.log` instead of stderr
    pub prefix: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            prefix: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// First existing config file among the default locations
    pub fn locate_default() -> Option<PathBuf> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("crawlmeta").join("config.toml")),
            Some(PathBuf::from("/etc/crawlmeta/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        config_paths.into_iter().flatten().find(|path| path.exists())
    }

    /// Apply `CRAWLMETA_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    ///
    /// A variable that does not parse as its setting's type is an error.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // Server overrides
        if let Some(host) = lookup("CRAWLMETA_HOST") {
            self.server.host = host;
        }
        override_parsed(&lookup, "CRAWLMETA_PORT", &mut self.server.port)?;
        override_parsed(&lookup, "CRAWLMETA_THREADS", &mut self.server.worker_threads)?;
        override_parsed(&lookup, "CRAWLMETA_QUEUE_DEPTH", &mut self.server.queue_depth)?;
        override_parsed(&lookup, "CRAWLMETA_PRETTY", &mut self.server.pretty)?;

        // Query overrides
        override_parsed(&lookup, "CRAWLMETA_MAX_RESULTS", &mut self.query.max_results)?;
        override_parsed(&lookup, "CRAWLMETA_SCAN_TIMEOUT_MS", &mut self.query.scan_timeout_ms)?;

        // Store overrides
        if let Some(stores) = lookup("CRAWLMETA_STORES") {
            self.stores.locations = stores
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        // Logging overrides
        if let Some(level) = lookup("CRAWLMETA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CRAWLMETA_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(prefix) = lookup("CRAWLMETA_LOG_PREFIX") {
            self.logging.prefix = Some(prefix).filter(|p| !p.is_empty());
        }
        Ok(())
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "server.worker_threads must be at least 1".to_string(),
            ));
        }
        if self.stores.locations.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one store location is required".to_string(),
            ));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging.format must be pretty or json, got {}",
                other
            ))),
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            worker_threads: self.server.worker_threads,
            queue_depth: self.server.queue_depth,
            pretty: self.server.pretty,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_results: self.query.max_results,
            scan_timeout: match self.query.scan_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{} cannot be parsed: {:?}", name, raw)))?;
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Crawlmeta Configuration
#
# Environment variables override these settings:
# - CRAWLMETA_HOST, CRAWLMETA_PORT
# - CRAWLMETA_THREADS, CRAWLMETA_QUEUE_DEPTH, CRAWLMETA_PRETTY
# - CRAWLMETA_MAX_RESULTS, CRAWLMETA_SCAN_TIMEOUT_MS
# - CRAWLMETA_STORES (comma separated)
# - CRAWLMETA_LOG_LEVEL, CRAWLMETA_LOG_FORMAT, CRAWLMETA_LOG_PREFIX
#
# Command-line flags override both.

[server]
# Address to bind to
host = "127.0.0.1"

# Port to listen on
port = 8080

# Worker threads; also the number of queries served at once
worker_threads = 8

# Queries allowed to wait for a worker before the server answers 503
queue_depth = 1000

# Pretty-print all JSON responses
pretty = false

[query]
# Result cap for requests that do not pass max_results
max_results = 10000

# Scan deadline per request in milliseconds (0 = unbounded)
scan_timeout_ms = 30000

[stores]
# One SQLite snapshot per crawl
locations = []
# locations = ["/data/crawl-2015-27.db", "/data/crawl-2015-32.db"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Write <prefix>.access.log and <prefix>.error.log instead of stderr
# prefix = "/var/log/crawlmeta/crawlmeta"
"#
    .to_string()
}
