//! Configuration module for pitchfork-dl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pitchfork_dl::config::{parse_config_file, validate};
//! use std::path::Path;
//!
//! let config = parse_config_file(Path::new("pitchfork-dl.toml")).unwrap();
//! validate(&config).unwrap();
//! println!("Page workers: {}", config.pages.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, NetworkConfig, OutputConfig, OutputFormat, PageRange, QueueConfig,
    StageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, parse_config_file, parse_config_str};
pub use validation::{validate, MAX_WORKERS};
