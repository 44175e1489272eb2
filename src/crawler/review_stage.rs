//! Review stage: review identifiers in, persisted records out

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::Extractor;
use crate::crawler::worker::{retry_while_empty, Attempt, Retried, TaskHandler};
use crate::state::{AbandonReason, CrawlResult, ItemTask, Review, TaskOutcome};
use crate::storage::Persister;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Handler run by every review worker
pub struct ReviewHandler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    persister: Arc<dyn Persister>,
    retry_delay: Duration,
}

impl ReviewHandler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        persister: Arc<dyn Persister>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            persister,
            retry_delay,
        }
    }

    async fn attempt(&self, item: &ItemTask, attempt: u32) -> Attempt<Review, AbandonReason> {
        tracing::debug!("Fetching review {} (attempt {})", item, attempt);

        let response = match self.fetcher.fetch_review(item).await {
            Ok(response) => response,
            Err(e) => return Attempt::Stop(AbandonReason::Transport(e.to_string())),
        };

        if response.is_not_found() {
            return Attempt::Stop(AbandonReason::NotFound);
        }
        if !response.is_success() {
            return Attempt::Stop(AbandonReason::Status(response.status));
        }

        match self.extractor.extract_review(item.id(), &response.body) {
            Ok(CrawlResult::Record(review)) => Attempt::Ready(review),
            Ok(CrawlResult::Empty) => {
                tracing::warn!(
                    "Review {} came back empty, retrying in {:?}",
                    item,
                    self.retry_delay
                );
                Attempt::Empty
            }
            Err(e) => Attempt::Stop(AbandonReason::Extract(e.to_string())),
        }
    }
}

#[async_trait]
impl TaskHandler<ItemTask> for ReviewHandler {
    async fn handle(&self, item: ItemTask, token: &CancellationToken) -> TaskOutcome {
        let result =
            retry_while_empty(self.retry_delay, token, |attempt| self.attempt(&item, attempt))
                .await;

        match result {
            Retried::Ready {
                value: review,
                attempts,
            } => match self.persister.persist(item.id(), &review).await {
                Ok(()) => {
                    for line in review.summary_lines() {
                        tracing::info!("{}", line);
                    }
                    TaskOutcome::Completed { attempts }
                }
                Err(e) => {
                    tracing::warn!("Failed to persist review {}: {}", item, e);
                    TaskOutcome::Abandoned {
                        reason: AbandonReason::Persist(e.to_string()),
                        attempts,
                    }
                }
            },
            Retried::Stopped { reason, attempts } => {
                match &reason {
                    AbandonReason::Transport(_) => {
                        tracing::warn!("Transport error on review {}: {}", item, reason)
                    }
                    AbandonReason::NotFound => tracing::warn!("Review {} not found", item),
                    _ => tracing::warn!("Skipping review {}: {}", item, reason),
                }
                TaskOutcome::Abandoned { reason, attempts }
            }
            Retried::Cancelled { attempts } => {
                tracing::debug!("Review {} cancelled during retry", item);
                TaskOutcome::Cancelled { attempts }
            }
        }
    }
}
