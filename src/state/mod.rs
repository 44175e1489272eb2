//! State module for tracking crawl progress
//!
//! This module provides the data that flows through the pipeline and the
//! states it moves through.
//!
//! # Components
//!
//! - `PageTask` / `ItemTask`: units of work for the page and review stages
//! - `TaskOutcome`: how a single drawn task was resolved
//! - `PipelinePhase`: the shutdown state machine
//! - `Review` / `CrawlResult`: the structured record extracted from a review page

mod phase;
mod review;
mod task;

// Re-export main types
pub use phase::PipelinePhase;
pub use review::{Album, CrawlResult, Review};
pub use task::{AbandonReason, ItemTask, PageTask, TaskOutcome};
