//! pitchfork-dl main entry point
//!
//! This is the command-line interface for the review catalog crawler.

use anyhow::Context;
use clap::Parser;
use pitchfork_dl::config::{
    compute_config_hash, parse_config_file, validate, Config, OutputFormat, PageRange,
};
use pitchfork_dl::crawler::{crawl, shutdown_signal, Extractor, Fetcher, HtmlExtractor, HttpFetcher};
use pitchfork_dl::output::print_summary;
use pitchfork_dl::state::{CrawlResult, ItemTask, PageTask};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code after an interrupted crawl (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

/// pitchfork-dl: downloads album reviews
///
/// Walks the paginated review listing, then fetches and saves every review it
/// finds. Ctrl-C stops fetching listing pages first, then stops the review
/// workers once the listing workers are gone.
#[derive(Parser, Debug)]
#[command(name = "pitchfork-dl")]
#[command(version)]
#[command(about = "Downloads album reviews from a paginated catalog", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// First listing page to fetch
    #[arg(long, value_name = "N")]
    first: Option<u32>,

    /// Stop before this page (exclusive); 0 crawls until a page is not found
    #[arg(long, value_name = "N")]
    last: Option<u32>,

    /// Proxy URL (http, https, socks5 or socks5h)
    #[arg(long, value_name = "URL", conflicts_with = "no_proxy")]
    proxy: Option<String>,

    /// Ignore any proxy set in the configuration file
    #[arg(long)]
    no_proxy: bool,

    /// Directory for JSON output
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output format: json or sqlite
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// SQLite database path for sqlite output
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Number of listing page workers
    #[arg(long, value_name = "N")]
    page_workers: Option<usize>,

    /// Number of review workers
    #[arg(long, value_name = "N")]
    review_workers: Option<usize>,

    /// Delay before re-fetching an empty listing page, in milliseconds
    #[arg(long, value_name = "MS")]
    page_retry_ms: Option<u64>,

    /// Delay before re-fetching an empty review, in milliseconds
    #[arg(long, value_name = "MS")]
    review_retry_ms: Option<u64>,

    /// Capacity of the queue between the two stages
    #[arg(long, value_name = "N")]
    queue_capacity: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and show what would be crawled
    #[arg(long, conflicts_with_all = ["inspect_page", "inspect_review"])]
    dry_run: bool,

    /// Fetch one listing page and print its review identifiers
    #[arg(long, value_name = "N", conflicts_with_all = ["dry_run", "inspect_review"])]
    inspect_page: Option<u32>,

    /// Fetch one review and print its summary
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "inspect_page"])]
    inspect_review: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
        Ok(ExitCode::SUCCESS)
    } else if let Some(page) = cli.inspect_page {
        handle_inspect_page(&config, page).await
    } else if let Some(id) = &cli.inspect_review {
        handle_inspect_review(&config, id).await
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pitchfork_dl=info,warn"),
            1 => EnvFilter::new("pitchfork_dl=debug,info"),
            2 => EnvFilter::new("pitchfork_dl=trace,debug"),
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

/// Reads the config file (if any), applies command-line overrides and
/// validates the result
fn load_configuration(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let config = parse_config_file(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let hash = compute_config_hash(path)?;
            tracing::info!("Configuration loaded (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file, using defaults");
            Config::default()
        }
    };

    apply_overrides(cli, &mut config);
    validate(&config).context("invalid configuration")?;

    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(first) = cli.first {
        config.crawl.first_page = first;
    }
    if let Some(last) = cli.last {
        config.crawl.last_page = last;
    }
    if cli.no_proxy {
        config.network.proxy = None;
    } else if let Some(proxy) = &cli.proxy {
        config.network.proxy = Some(proxy.clone());
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(dir) = &cli.output {
        config.output.directory = dir.clone();
    }
    if let Some(path) = &cli.database {
        config.output.database_path = path.clone();
    }
    if let Some(workers) = cli.page_workers {
        config.pages.workers = workers;
    }
    if let Some(workers) = cli.review_workers {
        config.reviews.workers = workers;
    }
    if let Some(ms) = cli.page_retry_ms {
        config.pages.retry_delay_ms = ms;
    }
    if let Some(ms) = cli.review_retry_ms {
        config.reviews.retry_delay_ms = ms;
    }
    if let Some(capacity) = cli.queue_capacity {
        config.queue.capacity = capacity;
    }
}

/// Handles the --dry-run mode: shows the merged configuration
fn handle_dry_run(config: &Config) {
    println!("=== pitchfork-dl Dry Run ===\n");

    println!("Pages:");
    match config.crawl.page_range() {
        PageRange::Bounded { first, last } => {
            println!("  Range: [{}, {}) ({} pages)", first, last, last - first)
        }
        PageRange::Unbounded { first } => println!("  Range: {} until a page is not found", first),
    }
    println!("  Workers: {}", config.pages.workers);
    println!("  Retry delay: {}ms", config.pages.retry_delay_ms);

    println!("\nReviews:");
    println!("  Workers: {}", config.reviews.workers);
    println!("  Retry delay: {}ms", config.reviews.retry_delay_ms);
    println!("  Queue capacity: {}", config.queue.capacity);

    println!("\nNetwork:");
    println!("  Base URL: {}", config.network.base_url);
    println!(
        "  Proxy: {}",
        config.network.proxy.as_deref().unwrap_or("none")
    );
    println!("  Timeout: {}s", config.network.timeout_secs);
    println!("  User agent: {}", config.network.user_agent);

    println!("\nOutput:");
    match config.output.format {
        OutputFormat::Json => println!("  JSON files in {}", config.output.directory.display()),
        OutputFormat::Sqlite => {
            println!("  SQLite database {}", config.output.database_path.display())
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles --inspect-page: fetches one listing page and prints its identifiers
async fn handle_inspect_page(config: &Config, page: u32) -> anyhow::Result<ExitCode> {
    let fetcher = HttpFetcher::from_config(&config.network)?;
    let extractor = HtmlExtractor::new()?;

    let response = fetcher.fetch_page(PageTask(page)).await?;
    if !response.is_success() {
        anyhow::bail!("{} returned HTTP {}", response.url, response.status);
    }

    let ids = extractor.extract_page_items(&response.body)?;
    println!("Page {} ({} reviews):", page, ids.len());
    for id in &ids {
        println!("  {}", id);
    }

    Ok(ExitCode::SUCCESS)
}

/// Handles --inspect-review: fetches one review and prints its summary
async fn handle_inspect_review(config: &Config, id: &str) -> anyhow::Result<ExitCode> {
    let fetcher = HttpFetcher::from_config(&config.network)?;
    let extractor = HtmlExtractor::new()?;
    let item = ItemTask::new(id);

    let response = fetcher.fetch_review(&item).await?;
    if !response.is_success() {
        anyhow::bail!("{} returned HTTP {}", response.url, response.status);
    }

    match extractor.extract_review(item.id(), &response.body)? {
        CrawlResult::Record(review) => {
            for line in review.summary_lines() {
                println!("{}", line);
            }
            println!(
                "Article: {} paragraphs",
                review.article.split("\n\n").filter(|p| !p.is_empty()).count()
            );
        }
        CrawlResult::Empty => println!("Review {} has no albums on the page", item),
    }

    Ok(ExitCode::SUCCESS)
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<ExitCode> {
    let summary = match crawl(config, shutdown_signal()).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);

    if summary.interrupted {
        Ok(ExitCode::from(EXIT_INTERRUPTED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
