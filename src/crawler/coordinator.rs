//! Crawler coordinator - pipeline wiring and the two-phase drain
//!
//! This module builds one run of the pipeline:
//! - The page source feeding the page queue
//! - The page stage feeding the bounded review queue
//! - The review stage feeding the persister
//! - The shutdown sequence: pages stop first, then the review queue drains

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::page_stage::PageHandler;
use crate::crawler::parser::Extractor;
use crate::crawler::review_stage::ReviewHandler;
use crate::crawler::shutdown::ShutdownCoordinator;
use crate::crawler::source::PageSource;
use crate::crawler::worker::{spawn_stage, DrawPolicy, TaskQueue};
use crate::output::CrawlSummary;
use crate::state::PipelinePhase;
use crate::storage::Persister;
use crate::PitchforkError;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    persister: Arc<dyn Persister>,
    shutdown: ShutdownCoordinator,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `fetcher` - Network access shared by both stages
    /// * `extractor` - Body extraction shared by both stages
    /// * `persister` - Destination for extracted reviews
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        persister: Arc<dyn Persister>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            persister,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Receiver observing the pipeline phase
    pub fn subscribe_phase(&self) -> watch::Receiver<PipelinePhase> {
        self.shutdown.subscribe()
    }

    /// Runs the pipeline until the work is done or `interrupt` completes
    ///
    /// Without an interrupt the run ends once the page range is exhausted and
    /// every queued review has been processed. When `interrupt` completes the
    /// page stage is cancelled and joined. Only then is the review stage
    /// cancelled, which cuts its retry sleeps short; its workers still draw
    /// every review already queued before they exit.
    ///
    /// # Arguments
    ///
    /// * `interrupt` - Completes when an external stop is requested
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Both stages have stopped
    /// * `Err(PitchforkError)` - The phase machine was driven out of order
    pub async fn run<F>(mut self, interrupt: F) -> Result<CrawlSummary, PitchforkError>
    where
        F: Future<Output = ()>,
    {
        let started_at = Utc::now();
        let range = self.config.crawl.page_range();
        let pages_config = &self.config.pages;
        let reviews_config = &self.config.reviews;

        tracing::info!(
            "Starting crawl: pages {:?}, {} page workers, {} review workers, queue capacity {}",
            range,
            pages_config.workers,
            reviews_config.workers,
            self.config.queue.capacity
        );

        let pages_token = self.shutdown.pages_token();
        let exhausted = CancellationToken::new();

        let (page_tx, page_queue) = TaskQueue::channel(pages_config.workers.max(1));
        let (review_tx, review_queue) = TaskQueue::channel(self.config.queue.capacity.max(1));

        let source = tokio::spawn(PageSource::new(range).run(
            page_tx,
            pages_token.clone(),
            exhausted.clone(),
        ));

        // The page handler owns the only review sender; the review queue
        // closes once every page worker has exited
        let page_handler = Arc::new(PageHandler::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            review_tx,
            pages_config.retry_delay(),
            range.is_unbounded(),
            exhausted,
        ));
        let review_handler = Arc::new(ReviewHandler::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            Arc::clone(&self.persister),
            reviews_config.retry_delay(),
        ));

        let mut pages = spawn_stage(
            "page",
            pages_config.workers,
            page_queue,
            pages_token,
            DrawPolicy::StopOnCancel,
            page_handler,
        );
        let mut reviews = spawn_stage(
            "review",
            reviews_config.workers,
            review_queue.clone(),
            self.shutdown.reviews_token(),
            DrawPolicy::DrainQueue,
            review_handler,
        );

        tokio::pin!(interrupt);

        // Running
        let interrupted = tokio::select! {
            biased;
            _ = &mut interrupt => true,
            _ = pages.join() => false,
        };
        if interrupted {
            self.shutdown.record_interrupt();
            tracing::info!("Stopping {} page workers", pages.running());
            self.shutdown.cancel_pages();
        }

        // DrainingPages
        self.shutdown.transition(PipelinePhase::DrainingPages)?;
        pages.join().await;

        let pages_emitted = match source.await {
            Ok(emitted) => emitted,
            Err(e) => {
                tracing::error!(
                    "{}",
                    PitchforkError::Worker(format!("page source: {}", e))
                );
                0
            }
        };
        self.shutdown.pages_drained();
        tracing::info!(
            "Page stage drained after {} pages, {} reviews still queued",
            pages_emitted,
            review_queue.queued()
        );

        // DrainingReviews
        self.shutdown.transition(PipelinePhase::DrainingReviews)?;
        if self.shutdown.interrupted() {
            self.shutdown.cancel_reviews();
        } else {
            let interrupted = tokio::select! {
                biased;
                _ = &mut interrupt => true,
                _ = reviews.join() => false,
            };
            if interrupted {
                self.shutdown.record_interrupt();
                self.shutdown.cancel_reviews();
            }
        }
        reviews.join().await;
        self.shutdown.reviews_drained();

        // Only non-zero if review workers died before the queue emptied
        let reviews_left_queued = review_queue.drain_remaining();
        if reviews_left_queued > 0 {
            tracing::warn!(
                "{} reviews were still queued when the review stage stopped",
                reviews_left_queued
            );
        }

        self.shutdown.transition(PipelinePhase::Stopped)?;

        let summary = CrawlSummary {
            range,
            started_at,
            finished_at: Utc::now(),
            interrupted: self.shutdown.interrupted(),
            pages_emitted,
            reviews_left_queued,
            pages: pages.into_report(),
            reviews: reviews.into_report(),
            timeline: self.shutdown.timeline(),
        };

        tracing::info!(
            "Crawl finished: {} reviews saved, {} abandoned{}",
            summary.reviews.completed,
            summary.reviews.abandoned,
            if summary.interrupted {
                " (interrupted)"
            } else {
                ""
            }
        );

        Ok(summary)
    }
}
