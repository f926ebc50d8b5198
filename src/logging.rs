//! Logging setup
//!
//! `RUST_LOG` wins when set. Otherwise the level comes from the config,
//! raised by the command-line verbosity (1 = debug, 2+ = trace).
//!
//! Without a log prefix everything goes to stderr. With a prefix, HTTP
//! access events (target `tower_http`) go to `<prefix>.access.log` and
//! everything else to `<prefix>.error.log`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::{filter_fn, Targets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

/// Target of the access events emitted by the HTTP trace layer
pub const ACCESS_TARGET: &str = "tower_http";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot install log subscriber: {0}")]
    Init(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<(), LoggingError> {
    let level = effective_level(&config.level, verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&level)));
    let json = config.format == "json";

    let layers: Vec<BoxedLayer> = match config.prefix {
        None => vec![stderr_layer(json)],
        Some(ref prefix) => {
            let (access_path, error_path) = log_paths(prefix);
            let access = open_log(&access_path)?;
            let errors = open_log(&error_path)?;

            vec![
                file_layer(json, access)
                    .with_filter(Targets::new().with_target(ACCESS_TARGET, Level::TRACE))
                    .boxed(),
                file_layer(json, errors)
                    .with_filter(filter_fn(|meta| !meta.target().starts_with(ACCESS_TARGET)))
                    .boxed(),
            ]
        }
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

/// Level name after applying command-line verbosity
pub fn effective_level(configured: &str, verbosity: u8) -> String {
    match verbosity {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Filter directives used when `RUST_LOG` is unset
///
/// Access events stay on at info even when the base level is quieter.
pub fn default_directives(level: &str) -> String {
    match level {
        "debug" | "trace" => level.to_string(),
        _ => format!("{},{}=info", level, ACCESS_TARGET),
    }
}

/// `<prefix>.access.log` and `<prefix>.error.log`
pub fn log_paths(prefix: &str) -> (PathBuf, PathBuf) {
    (
        PathBuf::from(format!("{}.access.log", prefix)),
        PathBuf::from(format!("{}.error.log", prefix)),
    )
}

fn open_log(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn stderr_layer(json: bool) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn file_layer(json: bool, file: File) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file));
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}
