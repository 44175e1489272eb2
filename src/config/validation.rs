use crate::config::types::{
    Config, CrawlConfig, NetworkConfig, OutputConfig, OutputFormat, QueueConfig, StageConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on workers per stage
pub const MAX_WORKERS: usize = 512;

const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Validates the entire configuration
///
/// Runs before the pipeline starts; a configuration that fails here never
/// spawns a worker.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_stage_config("pages", &config.pages)?;
    validate_stage_config("reviews", &config.reviews)?;
    validate_queue_config(&config.queue)?;
    validate_network_config(&config.network)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.first_page == 0 {
        return Err(ConfigError::Validation(
            "first_page must be >= 1".to_string(),
        ));
    }

    // 0 is the unbounded sentinel
    if config.last_page != 0 && config.last_page <= config.first_page {
        return Err(ConfigError::Validation(format!(
            "last_page must be greater than first_page (got first={}, last={})",
            config.first_page, config.last_page
        )));
    }

    Ok(())
}

fn validate_stage_config(stage: &str, config: &StageConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "{}.workers must be between 1 and {}, got {}",
            stage, MAX_WORKERS, config.workers
        )));
    }

    Ok(())
}

fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.capacity == 0 {
        return Err(ConfigError::Validation(
            "queue.capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    // Review identifiers are joined onto the base, so it has to be a directory
    if !base.path().ends_with('/') {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must end with '/', got '{}'",
            config.base_url
        )));
    }

    if let Some(proxy) = &config.proxy {
        let proxy_url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !PROXY_SCHEMES.contains(&proxy_url.scheme()) {
            return Err(ConfigError::InvalidUrl(format!(
                "proxy scheme must be one of {:?}, got '{}'",
                PROXY_SCHEMES,
                proxy_url.scheme()
            )));
        }
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.format {
        OutputFormat::Json if config.directory.as_os_str().is_empty() => Err(
            ConfigError::Validation("output directory cannot be empty".to_string()),
        ),
        OutputFormat::Sqlite if config.database_path.as_os_str().is_empty() => Err(
            ConfigError::Validation("database_path cannot be empty".to_string()),
        ),
        _ => Ok(()),
    }
}
