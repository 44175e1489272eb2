//! Crawler module for the two-stage review pipeline
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing and review pages
//! - HTML extraction of review identifiers and review records
//! - The page source and the two worker stages
//! - Shutdown coordination and overall pipeline wiring

mod coordinator;
mod fetcher;
mod page_stage;
mod parser;
mod review_stage;
mod shutdown;
mod source;
mod worker;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use page_stage::PageHandler;
pub use parser::{ExtractError, Extractor, HtmlExtractor};
pub use review_stage::ReviewHandler;
pub use shutdown::{shutdown_signal, ShutdownCoordinator};
pub use source::PageSource;
pub use worker::{
    cancellable_sleep, retry_while_empty, spawn_stage, Attempt, DrawPolicy, Retried, StagePool,
    TaskHandler, TaskQueue,
};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::storage::open_persister;
use crate::PitchforkError;
use std::future::Future;
use std::sync::Arc;

/// Runs a complete crawl against the live catalog
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and URL scheme
/// 2. Compile the HTML selectors
/// 3. Open the configured output
/// 4. Run the pipeline until it finishes or `interrupt` completes
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `interrupt` - Completes when the crawl should drain and stop
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - The pipeline stopped, normally or after an interrupt
/// * `Err(PitchforkError)` - Startup failed
pub async fn crawl<F>(config: Config, interrupt: F) -> Result<CrawlSummary, PitchforkError>
where
    F: Future<Output = ()>,
{
    let fetcher = Arc::new(HttpFetcher::from_config(&config.network)?);
    let extractor = Arc::new(HtmlExtractor::new()?);
    let persister = open_persister(&config.output)?;

    Coordinator::new(config, fetcher, extractor, persister)
        .run(interrupt)
        .await
}
