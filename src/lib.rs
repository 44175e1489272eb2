//! pitchfork-dl: a two-stage review catalog crawler
//!
//! Listing pages are fetched by one worker pool, the review identifiers they
//! contain are handed through a bounded queue to a second pool, and every
//! review is fetched, extracted and persisted independently. An interrupt
//! drains the page stage first and the review stage second.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for pitchfork-dl operations
#[derive(Debug, Error)]
pub enum PitchforkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crawler::ExtractError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelinePhase,
        to: state::PipelinePhase,
    },

    #[error("Worker failure: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for pitchfork-dl operations
pub type Result<T> = std::result::Result<T, PitchforkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, Extractor, Fetcher, HtmlExtractor, HttpFetcher};
pub use output::CrawlSummary;
pub use state::{CrawlResult, ItemTask, PageTask, PipelinePhase, Review, TaskOutcome};
pub use storage::Persister;
