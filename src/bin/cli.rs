//! Crawlmeta CLI
//!
//! Command-line interface for Crawlmeta operations:
//! - List crawls and run domain queries against a server
//! - Check server status
//! - Inspect store files without a server
//! - Generate a config file

use clap::{Parser, Subcommand};
use crawlmeta::config::generate_default_config;
use crawlmeta::query::{QueryEngine, QueryRequest};
use crawlmeta::storage::{key, Catalog, OrderedStore, SqliteStore, StoreHandle};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "crawlmeta-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a crawl metadata server or inspect crawl stores")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the crawls a server holds
    Crawls,

    /// Look up a domain
    Query {
        /// Domain or URL, e.g. example.com/blog
        domain: String,
        /// Restrict to one crawl
        #[arg(short, long)]
        crawl: Option<String>,
        /// Include observations
        #[arg(long)]
        full: bool,
        /// Match the URL exactly
        #[arg(long)]
        exact: bool,
        /// Result cap
        #[arg(short, long)]
        max_results: Option<usize>,
        /// Only this public suffix
        #[arg(long)]
        suffix: Option<String>,
        /// Only paths starting with this prefix
        #[arg(long)]
        path: Option<String>,
        /// Report timing and skipped keys
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show server status
    Status,

    /// Inspect store files directly
    Inspect {
        /// Store files
        #[arg(required = true)]
        stores: Vec<PathBuf>,
        /// Also run a domain query against them
        #[arg(short, long)]
        domain: Option<String>,
        /// Result cap for the query
        #[arg(short, long, default_value = "20")]
        max_results: usize,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Crawls => {
            let body = get_json(&client, &format!("{}/crawls", cli.api_url)).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let crawls = body["crawls"].as_array().cloned().unwrap_or_default();
                if crawls.is_empty() {
                    println!("No crawls registered.");
                }
                for crawl in crawls {
                    println!("{}", crawl.as_str().unwrap_or_default());
                }
            }
        }

        Commands::Query {
            domain,
            crawl,
            full,
            exact,
            max_results,
            suffix,
            path,
            verbose,
        } => {
            let mut url = format!(
                "{}/query_domain?domain={}",
                cli.api_url,
                urlencoding::encode(&domain)
            );
            if let Some(crawl) = crawl {
                url.push_str(&format!("&crawl={}", urlencoding::encode(&crawl)));
            }
            if full {
                url.push_str("&full=1");
            }
            if exact {
                url.push_str("&exact");
            }
            if let Some(n) = max_results {
                url.push_str(&format!("&max_results={}", n));
            }
            if let Some(suffix) = suffix {
                url.push_str(&format!("&suffix={}", urlencoding::encode(&suffix)));
            }
            if let Some(path) = path {
                url.push_str(&format!("&path={}", urlencoding::encode(&path)));
            }
            if verbose {
                url.push_str("&verbose");
            }

            let body = get_json(&client, &url).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_query_table(&body);
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;
                    println!("Crawlmeta v{}", health["version"].as_str().unwrap_or("?"));
                    println!();
                    println!("Status: {}", health["status"].as_str().unwrap_or("?"));
                    println!("Uptime: {}s", health["uptime_seconds"]);
                    println!();
                    println!("{:<20} {:<10} {}", "Crawl", "Status", "Location");
                    println!("{}", "-".repeat(60));
                    if let Some(crawls) = health["crawls"].as_object() {
                        for (crawl, store) in crawls {
                            println!(
                                "{:<20} {:<10} {}",
                                crawl,
                                store["status"].as_str().unwrap_or("?"),
                                store["location"].as_str().unwrap_or("?")
                            );
                        }
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to Crawlmeta API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Inspect {
            stores,
            domain,
            max_results,
        } => {
            let mut handles: Vec<StoreHandle> = Vec::with_capacity(stores.len());
            for path in &stores {
                let store = SqliteStore::open(path)?;
                describe_store(&store)?;
                handles.push(Arc::new(store));
            }

            let catalog = Catalog::from_stores(handles)?;
            println!("Crawls: {}", catalog.crawl_ids().join(", "));

            if let Some(domain) = domain {
                let engine = QueryEngine::new(Arc::new(catalog));
                let result = engine
                    .query(
                        QueryRequest::new(domain)
                            .max_results(max_results)
                            .diagnostics(true),
                    )
                    .await?;

                println!();
                for (uri, observations) in &result.matches {
                    let crawls: Vec<&str> = observations.iter().map(|o| o.crawl()).collect();
                    println!("{}  [{}]", uri, crawls.join(", "));
                }
                println!();
                println!(
                    "{} urls, {} keys visited, {} filtered, {} malformed{}",
                    result.matches.len(),
                    result.stats.visited,
                    result.stats.filtered,
                    result.stats.malformed,
                    if result.truncated { " (truncated)" } else { "" }
                );
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    std::fs::write(&path, config)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

/// GET `url` and decode the JSON body, failing on an error envelope
async fn get_json(client: &reqwest::Client, url: &str) -> anyhow::Result<Value> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        anyhow::bail!(
            "Request failed ({}): {}",
            status,
            body["message"].as_str().unwrap_or("no message")
        );
    }
    Ok(body)
}

fn print_query_table(body: &Value) {
    println!(
        "domain={} path={} crawl={}",
        body["query_domain"].as_str().unwrap_or_default(),
        body["query_path"].as_str().unwrap_or_default(),
        body["query_crawl"].as_str().filter(|c| !c.is_empty()).unwrap_or("*"),
    );
    println!();

    let urls = body["unique_urls"].as_array().cloned().unwrap_or_default();
    for url in &urls {
        let uri = url.as_str().unwrap_or_default();
        match body["data"].get(uri).and_then(Value::as_array) {
            Some(observations) => {
                let crawls: Vec<&str> = observations
                    .iter()
                    .filter_map(|pair| pair.get(0).and_then(Value::as_str))
                    .collect();
                println!("{}  [{}]", uri, crawls.join(", "));
            }
            None => println!("{}", uri),
        }
    }

    println!();
    print!("{} urls", urls.len());
    if let Some(time) = body["time"].as_str() {
        print!(" in {}", time);
    }
    if body["truncated"].as_bool().unwrap_or(false) {
        print!(" (truncated)");
    }
    if let Some(missing) = body["unavailable_crawls"].as_array() {
        let missing: Vec<&str> = missing.iter().filter_map(Value::as_str).collect();
        print!(" (unavailable: {})", missing.join(", "));
    }
    println!();
}

fn describe_store(store: &SqliteStore) -> anyhow::Result<()> {
    println!("{}", store.location());

    for (label, raw) in [("first", store.first_key()?), ("last", store.last_key()?)] {
        match raw {
            Some(raw) => match key::decode(&raw) {
                Ok(decoded) => println!("  {:<6} {}", label, decoded),
                Err(e) => println!("  {:<6} <{}>", label, e),
            },
            None => println!("  {:<6} <empty>", label),
        }
    }
    Ok(())
}
