//! Page-Extractor main entry point
//!
//! This is the command-line interface for the Page-Extractor crawler.

use anyhow::Context;
use clap::Parser;
use page_extractor::config::{load_config_with_hash, validate, Config, TextEncoding};
use page_extractor::crawler::{Notification, NotificationReceiver};
use page_extractor::output::{print_statistics, CrawlStatistics};
use page_extractor::Spider;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Page-Extractor: a "next page" crawler
///
/// Page-Extractor starts from a root URL, follows "next page" links up to a
/// maximum depth, and saves every page's text together with the result
/// links found on it.
#[derive(Parser, Debug)]
#[command(name = "page-extractor")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency next-page crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Root URL to start from (overrides the config file)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Directory for page and data files (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum link depth (overrides the config file)
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Number of concurrent connections (overrides the config file)
    #[arg(long, value_name = "N")]
    max_connections: Option<u32>,

    /// Text encoding of fetched pages: utf8 or gb18030
    #[arg(long, value_name = "ENCODING", value_parser = parse_encoding)]
    encoding: Option<TextEncoding>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_extractor=info,warn"),
            1 => EnvFilter::new("page_extractor=debug,info"),
            2 => EnvFilter::new("page_extractor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn parse_encoding(name: &str) -> Result<TextEncoding, String> {
    TextEncoding::from_name(name)
        .ok_or_else(|| format!("unknown encoding '{}', expected utf8 or gb18030", name))
}

/// Loads the config file (if any), applies CLI overrides and validates
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(url) = &cli.url {
        config.spider.root_url = Some(url.clone());
    }
    if let Some(output) = &cli.output {
        config.spider.output_dir = output.display().to_string();
    }
    if let Some(max_depth) = cli.max_depth {
        config.spider.max_depth = max_depth;
    }
    if let Some(max_connections) = cli.max_connections {
        config.spider.max_connections = max_connections;
    }
    if let Some(encoding) = cli.encoding {
        config.spider.encoding = encoding;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Page-Extractor Dry Run ===\n");

    println!("Spider Configuration:");
    println!(
        "  Root URL: {}",
        config.spider.root_url.as_deref().unwrap_or("(not set)")
    );
    println!("  Output directory: {}", config.spider.output_dir);
    println!("  Max depth: {}", config.spider.max_depth);
    println!("  Max connections: {}", config.spider.max_connections);
    println!("  Encoding: {:?}", config.spider.encoding);
    println!("  Request timeout: {}ms", config.spider.request_timeout_ms);
    println!("  Completion poll: {}ms", config.spider.completion_poll_ms);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Accept: {}", config.http.accept);

    println!("\nExtraction:");
    println!("  Next page label: {}", config.extraction.next_page_label);
    println!("  Result selector: {}", config.extraction.result_selector);
    println!("  Resolve redirects: {}", config.extraction.resolve_redirects);
    if config.extraction.resolve_redirects {
        println!(
            "  Max concurrent resolutions: {}",
            config.extraction.max_concurrent_resolutions
        );
    }

    println!("\n✓ Configuration is valid");
    if config.spider.root_url.is_none() {
        println!("✗ No root URL set; a crawl would not start");
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let output_dir = PathBuf::from(&config.spider.output_dir);
    let (spider, events) = Spider::new(config).context("Failed to create spider")?;
    let spider = Arc::new(spider);

    if !spider.download(&output_dir)? {
        anyhow::bail!("No root URL set; pass --url or set spider.root-url in the config file");
    }

    let abort_handle = Arc::clone(&spider);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, aborting crawl");
            abort_handle.abort();
        }
    });

    let stats = consume_notifications(events).await;
    print_statistics(&stats);

    Ok(())
}

/// Logs and tallies notifications until the crawl finishes
async fn consume_notifications(mut events: NotificationReceiver) -> CrawlStatistics {
    let mut stats = CrawlStatistics::new();

    while let Some(notification) = events.recv().await {
        stats.record(&notification);

        match &notification {
            Notification::ContentsSaved { path, url } => {
                tracing::info!("Saved {} -> {}", url, path.display());
            }
            Notification::DataSaved { name, url } => {
                tracing::debug!("{}  {}", name, url);
            }
            Notification::DownloadFinish { total_pages } => {
                tracing::info!("Download finished, {} pages", total_pages);
                break;
            }
            Notification::Error(failure) => {
                tracing::warn!("{}", failure);
            }
        }
    }

    stats
}
