use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for pitchfork-dl
///
/// Every section is optional in the TOML file. A missing section takes the
/// defaults below; a `[pages]` or `[reviews]` section must set both keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub pages: StageConfig,
    pub reviews: StageConfig,
    pub queue: QueueConfig,
    pub network: NetworkConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    /// 2 page workers retrying every 5s, 48 review workers retrying every 3s
    fn default() -> Self {
        Self {
            crawl: CrawlConfig::default(),
            pages: StageConfig {
                workers: 2,
                retry_delay_ms: 5000,
            },
            reviews: StageConfig {
                workers: 48,
                retry_delay_ms: 3000,
            },
            queue: QueueConfig::default(),
            network: NetworkConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Which pages to crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// First listing page to fetch (1-based)
    #[serde(rename = "first-page")]
    pub first_page: u32,

    /// Exclusive upper bound; 0 crawls until a page is reported missing
    #[serde(rename = "last-page")]
    pub last_page: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            first_page: 1,
            last_page: 0,
        }
    }
}

impl CrawlConfig {
    /// Interprets the configured bounds as a page range
    pub fn page_range(&self) -> PageRange {
        if self.last_page == 0 {
            PageRange::Unbounded {
                first: self.first_page,
            }
        } else {
            PageRange::Bounded {
                first: self.first_page,
                last: self.last_page,
            }
        }
    }
}

/// Page range to crawl. Bounded ranges are half-open: `[first, last)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRange {
    Bounded { first: u32, last: u32 },
    Unbounded { first: u32 },
}

impl PageRange {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded { .. })
    }
}

/// Per-stage worker pool settings
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Number of concurrent workers in the pool
    pub workers: usize,

    /// Delay before re-attempting a task whose content came back empty (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
}

impl StageConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Page -> review queue settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of review identifiers waiting for a review worker
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Network endpoint and client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Catalog root; listing pages are `<base-url>?page=N`, reviews `<base-url><id>/`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Optional proxy (http, https, socks5 or socks5h)
    pub proxy: Option<String>,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pitchfork.com/reviews/albums/".to_string(),
            proxy: None,
            timeout_secs: 30,
            user_agent: format!("pitchfork-dl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where persisted reviews go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One pretty-printed `<id>.json` file per review
    #[default]
    Json,
    /// One row per review in a SQLite database
    Sqlite,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown output format '{}' (expected json or sqlite)", other)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Directory receiving `<id>.json` files
    pub directory: PathBuf,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            directory: PathBuf::from("reviews"),
            database_path: PathBuf::from("reviews.db"),
        }
    }
}
