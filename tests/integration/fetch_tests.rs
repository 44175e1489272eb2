//! HttpFetcher and HtmlExtractor against a mock catalog

use crate::{listing_html, mount_listing, mount_review, CATALOG_PATH};
use pitchfork_dl::config::NetworkConfig;
use pitchfork_dl::crawler::{Extractor, FetchError, Fetcher, HtmlExtractor, HttpFetcher};
use pitchfork_dl::state::{CrawlResult, ItemTask, PageTask};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn network_config(server: &MockServer) -> NetworkConfig {
    NetworkConfig {
        base_url: format!("{}{}", server.uri(), CATALOG_PATH),
        proxy: None,
        timeout_secs: 5,
        user_agent: "TestCrawler/1.0".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_and_extract_listing_page() {
    let server = MockServer::start().await;
    mount_listing(&server, 3, listing_html(&["10-first", "11-second"])).await;

    let fetcher = HttpFetcher::from_config(&network_config(&server)).unwrap();
    let response = fetcher.fetch_page(PageTask(3)).await.unwrap();

    assert!(response.is_success());
    assert!(response.url.ends_with("/reviews/albums/?page=3"));

    let ids = HtmlExtractor::new()
        .unwrap()
        .extract_page_items(&response.body)
        .unwrap();
    assert_eq!(ids, vec!["10-first", "11-second"]);
}

#[tokio::test]
async fn test_fetch_and_extract_review() {
    let server = MockServer::start().await;
    mount_review(&server, "10-first").await;

    let fetcher = HttpFetcher::from_config(&network_config(&server)).unwrap();
    let item = ItemTask::new("10-first");
    let response = fetcher.fetch_review(&item).await.unwrap();

    let result = HtmlExtractor::new()
        .unwrap()
        .extract_review(item.id(), &response.body)
        .unwrap();
    let CrawlResult::Record(review) = result else {
        panic!("expected a review record");
    };

    assert_eq!(review.id, "10-first");
    assert_eq!(review.albums[0].title, "10-first");
    assert_eq!(review.albums[0].score, "8.1");
    assert_eq!(review.albums[0].year, "2020");
    assert_eq!(review.authors, vec!["Test Author"]);
    assert_eq!(review.article, "Opening.\n\nClosing.");
}

#[tokio::test]
async fn test_status_codes_are_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reviews/albums/broken/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::from_config(&network_config(&server)).unwrap();

    // Unmatched requests get wiremock's default 404
    let missing = fetcher.fetch_page(PageTask(99)).await.unwrap();
    assert!(missing.is_not_found());
    assert!(missing.body.is_empty());

    let broken = fetcher.fetch_review(&ItemTask::new("broken")).await.unwrap();
    assert_eq!(broken.status, 503);
    assert!(!broken.is_success());
    assert!(broken.body.is_empty());
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "TestCrawler/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&["1-a"])))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::from_config(&network_config(&server)).unwrap();
    let response = fetcher.fetch_page(PageTask(1)).await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_transport_error() {
    let config = NetworkConfig {
        base_url: "http://127.0.0.1:1/reviews/albums/".to_string(),
        proxy: None,
        timeout_secs: 2,
        user_agent: "TestCrawler/1.0".to_string(),
    };

    let fetcher = HttpFetcher::from_config(&config).unwrap();
    let result = fetcher.fetch_page(PageTask(1)).await;

    assert!(matches!(result, Err(FetchError::Transport { .. })));
}
