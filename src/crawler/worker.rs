//! Retrying-worker building block shared by both stages
//!
//! A stage is a fixed pool of workers that draw tasks from a shared queue and
//! hand each one to a `TaskHandler`. Sleeping before a retry always races
//! against the stage's cancellation token. Drawing a task does too, unless the
//! stage uses `DrawPolicy::DrainQueue`, in which case its workers keep drawing
//! until the queue is closed and empty.

use crate::output::{StageReport, WorkerReport};
use crate::state::TaskOutcome;
use crate::PitchforkError;
use async_trait::async_trait;
use kanal::{AsyncReceiver, AsyncSender};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Bounded multi-consumer queue shared by every worker of a stage
///
/// Each worker holds its own clone of the receiving half; the channel hands
/// every task to exactly one of them.
pub struct TaskQueue<T> {
    rx: AsyncReceiver<T>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T: Send> TaskQueue<T> {
    /// Creates a queue holding at most `capacity` tasks
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum queued tasks; must be greater than zero
    ///
    /// # Returns
    ///
    /// The sending half for the producer and the shared receiving half
    pub fn channel(capacity: usize) -> (AsyncSender<T>, Self) {
        let (tx, rx) = kanal::bounded_async(capacity);
        (tx, Self { rx })
    }

    /// Waits for the next task or for cancellation, whichever comes first
    ///
    /// Returns `None` once the token is cancelled or every sender is gone and
    /// the queue is empty. Cancellation wins when both are ready.
    pub async fn next(&self, token: &CancellationToken) -> Option<T> {
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            task = self.rx.recv() => task.ok(),
        }
    }

    /// Waits for the next task, ignoring cancellation
    ///
    /// Returns `None` once every sender is gone and the queue is empty.
    pub async fn next_until_closed(&self) -> Option<T> {
        self.rx.recv().await.ok()
    }

    /// Number of tasks waiting in the queue
    pub fn queued(&self) -> usize {
        self.rx.len()
    }

    /// Takes every task still queued and returns how many there were
    pub fn drain_remaining(&self) -> usize {
        let mut left = 0;
        while let Ok(Some(_)) = self.rx.try_recv() {
            left += 1;
        }
        left
    }
}

/// How the workers of a stage react to cancellation when drawing tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPolicy {
    /// Stop drawing as soon as the token is cancelled
    StopOnCancel,

    /// Keep drawing until the queue is closed and empty; the token only cuts
    /// retry sleeps and enqueues short
    DrainQueue,
}

/// Sleeps for `delay` unless the token is cancelled first
///
/// Returns `true` if the full delay elapsed, `false` if cancellation cut it short.
pub async fn cancellable_sleep(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Result of a single attempt at a task
#[derive(Debug)]
pub enum Attempt<T, S> {
    /// Usable content
    Ready(T),

    /// The fetch succeeded but carried nothing; try again after the delay
    Empty,

    /// Give up on the task
    Stop(S),
}

/// Result of `retry_while_empty`
#[derive(Debug, PartialEq, Eq)]
pub enum Retried<T, S> {
    Ready { value: T, attempts: u32 },
    Stopped { reason: S, attempts: u32 },
    Cancelled { attempts: u32 },
}

/// Re-runs `attempt` for the same task while it reports `Empty`
///
/// Attempts are numbered from 1. Between two attempts the worker sleeps for
/// `delay`; cancellation during that sleep ends the loop. An attempt already
/// in flight is never interrupted.
pub async fn retry_while_empty<T, S, F, Fut>(
    delay: Duration,
    token: &CancellationToken,
    mut attempt: F,
) -> Retried<T, S>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, S>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match attempt(attempts).await {
            Attempt::Ready(value) => return Retried::Ready { value, attempts },
            Attempt::Stop(reason) => return Retried::Stopped { reason, attempts },
            Attempt::Empty => {
                if !cancellable_sleep(delay, token).await {
                    return Retried::Cancelled { attempts };
                }
            }
        }
    }
}

/// Processes one task drawn by a worker
#[async_trait]
pub trait TaskHandler<T: Send + 'static>: Send + Sync + 'static {
    /// Resolves `task` completely before the worker draws the next one
    async fn handle(&self, task: T, token: &CancellationToken) -> TaskOutcome;
}

/// Running workers of one stage
pub struct StagePool {
    name: &'static str,
    tasks: JoinSet<WorkerReport>,
    token: CancellationToken,
    report: StageReport,
}

impl StagePool {
    /// Broadcasts cancellation to every worker of the stage
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Number of workers that have not been joined yet
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Waits until every worker has exited
    ///
    /// Cancel-safe: reports already collected are kept, so the wait can be
    /// raced in `select!` and resumed later.
    pub async fn join(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(report) => self.report.absorb(report),
                Err(e) => {
                    let err = PitchforkError::Worker(format!("{} worker: {}", self.name, e));
                    tracing::error!("{}", err);
                    self.report.failed_workers += 1;
                }
            }
        }
    }

    pub fn into_report(self) -> StageReport {
        self.report
    }
}

/// Spawns `workers` tasks that drain `queue` through `handler`
///
/// Each worker owns a clone of `handler`; once every worker has exited the
/// handler (and anything it holds, such as a downstream sender) is dropped.
pub fn spawn_stage<T, H>(
    name: &'static str,
    workers: usize,
    queue: TaskQueue<T>,
    token: CancellationToken,
    policy: DrawPolicy,
    handler: Arc<H>,
) -> StagePool
where
    T: Send + 'static,
    H: TaskHandler<T>,
{
    let mut tasks = JoinSet::new();

    for worker in 0..workers {
        tasks.spawn(run_worker(
            name,
            worker,
            queue.clone(),
            token.clone(),
            policy,
            Arc::clone(&handler),
        ));
    }

    tracing::info!("Started {} stage with {} workers", name, workers);

    StagePool {
        name,
        tasks,
        token,
        report: StageReport::new(name, workers),
    }
}

async fn run_worker<T, H>(
    name: &'static str,
    worker: usize,
    queue: TaskQueue<T>,
    token: CancellationToken,
    policy: DrawPolicy,
    handler: Arc<H>,
) -> WorkerReport
where
    T: Send + 'static,
    H: TaskHandler<T>,
{
    let mut report = WorkerReport::new(worker);

    loop {
        let task = match policy {
            DrawPolicy::StopOnCancel => queue.next(&token).await,
            DrawPolicy::DrainQueue => queue.next_until_closed().await,
        };
        let Some(task) = task else {
            break;
        };

        let outcome = handler.handle(task, &token).await;
        tracing::trace!("{} worker {}: task {}", name, worker, outcome);

        report.record(&outcome);
        if outcome.stops_worker() {
            break;
        }
    }

    tracing::debug!("{} worker {} exiting", name, worker);
    report.finish()
}
