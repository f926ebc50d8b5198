//! Crawlmeta Server
//!
//! Serves `/crawls` and `/query_domain` over one or more crawl stores.
//!
//! ```text
//! crawlmeta --port 8080 --nthreads 16 /data/crawl-2015-27.db /data/crawl-2015-32.db
//! ```
//!
//! Settings come from the config file, then `CRAWLMETA_*` environment
//! variables, then the flags below.

use anyhow::Context;
use clap::Parser;
use crawlmeta::api::{serve, AppState};
use crawlmeta::config::Config;
use crawlmeta::query::QueryEngine;
use crawlmeta::storage::Catalog;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "crawlmeta")]
#[command(about = "Crawl metadata server", long_about = None)]
#[command(version)]
struct Args {
    /// Address to bind to [default: 127.0.0.1]
    #[arg(long)]
    ip: Option<String>,

    /// Port to listen on [default: 8080]
    #[arg(long)]
    port: Option<u16>,

    /// Worker threads, also the number of concurrent queries [default: 8]
    #[arg(long)]
    nthreads: Option<usize>,

    /// Queries allowed to wait for a worker [default: 1000]
    #[arg(long)]
    queue_depth: Option<usize>,

    /// Default result cap [default: 10000]
    #[arg(long)]
    maxresults: Option<usize>,

    /// Scan deadline per request in milliseconds, 0 = unbounded [default: 30000]
    #[arg(long)]
    scan_timeout_ms: Option<u64>,

    /// Pretty-print JSON responses
    #[arg(long)]
    pretty: bool,

    /// Write <prefix>.access.log and <prefix>.error.log instead of stderr
    #[arg(long)]
    logprefix: Option<String>,

    /// Log format: pretty or json
    #[arg(long)]
    log_format: Option<String>,

    /// Verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: search the usual locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Crawl store files, one per crawl
    dbs: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, config_path) = load_config(&args)?;

    crawlmeta::logging::init(&config.logging, args.verbose)?;

    tracing::info!("Starting Crawlmeta server v{}", env!("CARGO_PKG_VERSION"));
    match config_path {
        Some(ref path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }

    let catalog = Catalog::register(&config.stores.locations)
        .context("Failed to register crawl stores")?;
    tracing::info!("Serving {} crawls: {:?}", catalog.len(), catalog.crawl_ids());

    let engine = Arc::new(QueryEngine::with_config(
        Arc::new(catalog),
        config.engine_config(),
    ));
    let api_config = config.api_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.worker_threads)
        .thread_name("crawlmeta-worker")
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        let state = AppState::new(engine, api_config.clone());
        serve(state, &api_config).await
    })?;

    tracing::info!("Crawlmeta server stopped");
    Ok(())
}

/// Settings from the chosen config file, the environment and the flags
///
/// Returns the file that was read so it can be logged once logging is up.
fn load_config(args: &Args) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let config_path = args.config.clone().or_else(Config::locate_default);
    let mut config = match config_path {
        Some(ref path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env()?,
    };
    apply_args(&mut config, args);
    config.validate()?;
    Ok((config, config_path))
}

/// Command-line flags override file and environment settings
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(ref ip) = args.ip {
        config.server.host = ip.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(threads) = args.nthreads {
        config.server.worker_threads = threads;
    }
    if let Some(depth) = args.queue_depth {
        config.server.queue_depth = depth;
    }
    if let Some(max_results) = args.maxresults {
        config.query.max_results = max_results;
    }
    if let Some(timeout) = args.scan_timeout_ms {
        config.query.scan_timeout_ms = timeout;
    }
    if args.pretty {
        config.server.pretty = true;
    }
    if let Some(ref prefix) = args.logprefix {
        config.logging.prefix = Some(prefix.clone());
    }
    if let Some(ref format) = args.log_format {
        config.logging.format = format.clone();
    }
    if !args.dbs.is_empty() {
        config.stores.locations = args.dbs.clone();
    }
}
