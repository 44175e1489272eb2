//! Page stage: listing pages in, review identifiers out
//!
//! For each page a worker fetches the listing, extracts the review identifiers
//! and pushes them onto the bounded review queue. A listing that comes back
//! without identifiers is fetched again after the stage's retry delay.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::Extractor;
use crate::crawler::worker::{retry_while_empty, Attempt, Retried, TaskHandler};
use crate::state::{AbandonReason, ItemTask, PageTask, TaskOutcome};
use async_trait::async_trait;
use kanal::AsyncSender;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Handler run by every page worker
pub struct PageHandler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    review_tx: AsyncSender<ItemTask>,
    retry_delay: Duration,

    /// In unbounded mode a missing page ends the catalog
    unbounded: bool,
    exhausted: CancellationToken,
}

impl PageHandler {
    /// Creates a page handler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Network access for listing pages
    /// * `extractor` - Turns a listing body into review identifiers
    /// * `review_tx` - Input of the review stage
    /// * `retry_delay` - Wait before re-fetching a listing with no identifiers
    /// * `unbounded` - Whether "not found" means the catalog has ended
    /// * `exhausted` - Cancelled when the catalog has ended
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        review_tx: AsyncSender<ItemTask>,
        retry_delay: Duration,
        unbounded: bool,
        exhausted: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            review_tx,
            retry_delay,
            unbounded,
            exhausted,
        }
    }

    async fn attempt(&self, page: PageTask, attempt: u32) -> Attempt<Vec<String>, AbandonReason> {
        tracing::debug!("Fetching page {} (attempt {})", page, attempt);

        let response = match self.fetcher.fetch_page(page).await {
            Ok(response) => response,
            Err(e) => return Attempt::Stop(AbandonReason::Transport(e.to_string())),
        };

        if response.is_not_found() {
            return Attempt::Stop(AbandonReason::NotFound);
        }
        if !response.is_success() {
            return Attempt::Stop(AbandonReason::Status(response.status));
        }

        match self.extractor.extract_page_items(&response.body) {
            Ok(ids) if ids.is_empty() => {
                tracing::warn!(
                    "Page {} listed no reviews, retrying in {:?}",
                    page,
                    self.retry_delay
                );
                Attempt::Empty
            }
            Ok(ids) => Attempt::Ready(ids),
            Err(e) => Attempt::Stop(AbandonReason::Extract(e.to_string())),
        }
    }

    /// Pushes every identifier onto the review queue, in page order
    async fn forward(
        &self,
        page: PageTask,
        ids: Vec<String>,
        attempts: u32,
        token: &CancellationToken,
    ) -> TaskOutcome {
        let total = ids.len();

        for (sent, id) in ids.into_iter().enumerate() {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::warn!(
                        "Page {} cancelled after queueing {} of {} reviews",
                        page,
                        sent,
                        total
                    );
                    return TaskOutcome::Cancelled { attempts };
                }
                result = self.review_tx.send(ItemTask::new(id)) => {
                    if result.is_err() {
                        tracing::warn!("Review queue closed while forwarding page {}", page);
                        return TaskOutcome::Abandoned {
                            reason: AbandonReason::QueueClosed,
                            attempts,
                        };
                    }
                }
            }
        }

        tracing::info!("Page {} with {} reviews", page, total);
        TaskOutcome::Completed { attempts }
    }
}

#[async_trait]
impl TaskHandler<PageTask> for PageHandler {
    async fn handle(&self, page: PageTask, token: &CancellationToken) -> TaskOutcome {
        let result =
            retry_while_empty(self.retry_delay, token, |attempt| self.attempt(page, attempt)).await;

        match result {
            Retried::Ready { value, attempts } => self.forward(page, value, attempts, token).await,
            Retried::Stopped {
                reason: AbandonReason::NotFound,
                attempts,
            } if self.unbounded => {
                tracing::info!("Page {} not found after {} attempt(s), stopping", page, attempts);
                self.exhausted.cancel();
                TaskOutcome::Exhausted
            }
            Retried::Stopped { reason, attempts } => {
                match &reason {
                    AbandonReason::Transport(_) => {
                        tracing::warn!("Transport error on page {}: {}", page, reason)
                    }
                    _ => tracing::warn!("Skipping page {}: {}", page, reason),
                }
                TaskOutcome::Abandoned { reason, attempts }
            }
            Retried::Cancelled { attempts } => {
                tracing::debug!("Page {} cancelled during retry", page);
                TaskOutcome::Cancelled { attempts }
            }
        }
    }
}
