//! HTTP fetcher implementation
//!
//! This module handles all network requests for the crawler:
//! - Building the HTTP client (user agent, timeout, optional proxy)
//! - Fetching listing pages and review pages, one attempt each
//! - Separating transport failures from received status codes

use crate::config::NetworkConfig;
use crate::state::{ItemTask, PageTask};
use crate::url::CatalogUrls;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use thiserror::Error;

/// Errors raised before a usable response exists
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, timeout, DNS or TLS failure, proxy failure
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The status line arrived but the body could not be read
    #[error("reading body of {url} failed: {message}")]
    Body { url: String, message: String },
}

/// A received response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Requested URL
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response body; only read for success statuses
    pub body: String,
}

impl FetchResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

/// Single-attempt network access for both stages
///
/// Implementations never retry; retry policy belongs to the stages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches one listing page
    async fn fetch_page(&self, page: PageTask) -> Result<FetchResponse, FetchError>;

    /// Fetches one review page
    async fn fetch_review(&self, item: &ItemTask) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The network configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (bad proxy URL, TLS backend)
///
/// # Example
///
/// ```no_run
/// use pitchfork_dl::config::NetworkConfig;
/// use pitchfork_dl::crawler::build_http_client;
///
/// let config = NetworkConfig {
///     proxy: Some("socks5://127.0.0.1:9150".to_string()),
///     ..NetworkConfig::default()
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &NetworkConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .connect_timeout(config.timeout().min(std::time::Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        tracing::debug!("Routing requests through proxy {}", proxy);
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    urls: CatalogUrls,
}

impl HttpFetcher {
    pub fn new(client: Client, urls: CatalogUrls) -> Self {
        Self { client, urls }
    }

    /// Builds the client and URL scheme from the network configuration
    pub fn from_config(config: &NetworkConfig) -> Result<Self, crate::PitchforkError> {
        let client = build_http_client(config)?;
        let urls = CatalogUrls::new(&config.base_url)?;
        Ok(Self::new(client, urls))
    }

    async fn get(&self, url: url::Url) -> Result<FetchResponse, FetchError> {
        let url_str = url.to_string();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url_str.clone(),
                message: describe_transport_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchResponse::new(url_str, status.as_u16(), String::new()));
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url_str.clone(),
            message: e.to_string(),
        })?;

        Ok(FetchResponse::new(url_str, status.as_u16(), body))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_page(&self, page: PageTask) -> Result<FetchResponse, FetchError> {
        self.get(self.urls.listing(page.number())).await
    }

    async fn fetch_review(&self, item: &ItemTask) -> Result<FetchResponse, FetchError> {
        self.get(self.urls.review(item.id())).await
    }
}

/// Classifies a reqwest error into a short description
fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
