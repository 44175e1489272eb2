//! Crawl reports and the console summary
//!
//! Every worker returns its own `WorkerReport` when it exits. Stage reports are
//! summed after the join, so no counter is shared between workers while the
//! pipeline runs.

use crate::config::PageRange;
use crate::state::TaskOutcome;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Counters kept by a single worker
#[derive(Debug, Clone)]
pub struct WorkerReport {
    /// Worker index within its stage
    pub worker: usize,

    /// Tasks resolved successfully
    pub completed: u64,

    /// Tasks given up on (transport error, bad status, persist failure)
    pub abandoned: u64,

    /// Tasks interrupted by cancellation
    pub cancelled: u64,

    /// Not-found pages that ended an unbounded source
    pub exhausted: u64,

    /// Empty-content re-attempts
    pub retries: u64,

    /// When the worker left its loop
    pub exited_at: Instant,
}

impl WorkerReport {
    pub fn new(worker: usize) -> Self {
        Self {
            worker,
            completed: 0,
            abandoned: 0,
            cancelled: 0,
            exhausted: 0,
            retries: 0,
            exited_at: Instant::now(),
        }
    }

    /// Counts one resolved task
    pub fn record(&mut self, outcome: &TaskOutcome) {
        self.retries += u64::from(outcome.attempts().saturating_sub(1));

        match outcome {
            TaskOutcome::Completed { .. } => self.completed += 1,
            TaskOutcome::Abandoned { .. } => self.abandoned += 1,
            TaskOutcome::Exhausted => self.exhausted += 1,
            TaskOutcome::Cancelled { .. } => self.cancelled += 1,
        }
    }

    /// Stamps the exit instant
    pub fn finish(mut self) -> Self {
        self.exited_at = Instant::now();
        self
    }
}

/// Sum of the reports of one stage
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub name: String,
    pub workers: usize,
    pub completed: u64,
    pub abandoned: u64,
    pub cancelled: u64,
    pub exhausted: u64,
    pub retries: u64,

    /// Workers that panicked instead of returning a report
    pub failed_workers: usize,

    /// Earliest worker exit
    pub first_exit: Option<Instant>,

    /// Latest worker exit
    pub last_exit: Option<Instant>,
}

impl StageReport {
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        Self {
            name: name.into(),
            workers,
            ..Self::default()
        }
    }

    /// Folds one worker's report into the stage totals
    pub fn absorb(&mut self, report: WorkerReport) {
        self.completed += report.completed;
        self.abandoned += report.abandoned;
        self.cancelled += report.cancelled;
        self.exhausted += report.exhausted;
        self.retries += report.retries;

        self.first_exit = Some(match self.first_exit {
            Some(t) => t.min(report.exited_at),
            None => report.exited_at,
        });
        self.last_exit = Some(match self.last_exit {
            Some(t) => t.max(report.exited_at),
            None => report.exited_at,
        });
    }

    /// Tasks drawn by the stage, whatever their outcome
    pub fn processed(&self) -> u64 {
        self.completed + self.abandoned + self.cancelled + self.exhausted
    }
}

/// Instants of each step of the two-phase drain
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownTimeline {
    pub interrupted_at: Option<Instant>,
    pub pages_cancelled_at: Option<Instant>,
    pub pages_drained_at: Option<Instant>,
    pub reviews_cancelled_at: Option<Instant>,
    pub reviews_drained_at: Option<Instant>,
}

impl ShutdownTimeline {
    /// Time from the interrupt to the last review worker exiting
    pub fn drain_duration(&self) -> Option<Duration> {
        match (self.interrupted_at, self.reviews_drained_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub range: PageRange,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// True if an external interrupt started the drain
    pub interrupted: bool,

    /// Page numbers handed to the page stage by the source
    pub pages_emitted: u64,

    /// Review identifiers still queued when the review stage stopped
    pub reviews_left_queued: usize,

    pub pages: StageReport,
    pub reviews: StageReport,
    pub timeline: ShutdownTimeline,
}

impl CrawlSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Number of reviews written to the output
    pub fn reviews_saved(&self) -> u64 {
        self.reviews.completed
    }
}

fn print_stage(stage: &StageReport) {
    println!("{} stage ({} workers):", stage.name, stage.workers);
    println!("  Processed: {}", stage.processed());
    println!("  Completed: {}", stage.completed);
    println!("  Abandoned: {}", stage.abandoned);
    println!("  Cancelled: {}", stage.cancelled);
    if stage.exhausted > 0 {
        println!("  Not found (end of catalog): {}", stage.exhausted);
    }
    println!("  Empty-content retries: {}", stage.retries);
    if stage.failed_workers > 0 {
        println!("  Failed workers: {}", stage.failed_workers);
    }
    println!();
}

/// Prints a run summary to stdout
///
/// # Arguments
///
/// * `summary` - The summary returned by the coordinator
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    match summary.range {
        PageRange::Bounded { first, last } => println!("  Pages: [{}, {})", first, last),
        PageRange::Unbounded { first } => println!("  Pages: {} until not found", first),
    }
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!(
        "  Elapsed: {:.1}s",
        summary.elapsed().num_milliseconds() as f64 / 1000.0
    );
    println!("  Pages emitted: {}", summary.pages_emitted);
    println!("  Reviews saved: {}", summary.reviews_saved());
    println!();

    print_stage(&summary.pages);
    print_stage(&summary.reviews);

    if summary.interrupted {
        println!("Interrupted:");
        println!("  Reviews left queued: {}", summary.reviews_left_queued);
        if let Some(drain) = summary.timeline.drain_duration() {
            println!("  Drain took: {:.2}s", drain.as_secs_f64());
        }
    }
}
