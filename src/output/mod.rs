//! Output module for crawl reports
//!
//! This module handles:
//! - Per-worker and per-stage counters collected during a run
//! - The shutdown timeline recorded by the coordinator
//! - Printing the final summary

pub mod stats;

pub use stats::{print_summary, CrawlSummary, ShutdownTimeline, StageReport, WorkerReport};
