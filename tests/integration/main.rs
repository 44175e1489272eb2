//! Integration tests for pitchfork-dl
//!
//! These tests use wiremock to stand in for the review catalog and run the
//! real HTTP fetcher, HTML extractor and persisters against it.

mod fetch_tests;
mod pipeline_tests;

use pitchfork_dl::config::{validate, Config};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CATALOG_PATH: &str = "/reviews/albums/";

/// Builds a listing page body holding the given review identifiers
pub fn listing_html(ids: &[&str]) -> String {
    let reviews: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="review"><a href="/reviews/albums/{}/"><h2>{}</h2></a></div>"#,
                id, id
            )
        })
        .collect();

    format!(
        r#"<html><body><div class="fragment-list">{}</div></body></html>"#,
        reviews
    )
}

/// Builds a review page body with one album
pub fn review_html(title: &str, score: &str) -> String {
    format!(
        r#"<html><body>
        <div class="review-detail"><article><div class="tombstone"><div class="row">
            <h2 class="artists"><ul class="artist-list"><li><a>Test Artist</a></li></ul></h2>
            <h1 class="review-title">{}</h1>
            <div class="score-box"><div class="score-circle"><span class="score">{}</span></div></div>
            <div class="album-art"><div class="labels-and-years">
                <ul class="label-list"><li>Test Label</li></ul>
                <span class="year">• 2020</span>
            </div></div>
        </div></div></article></div>
        <div class="review-body">
            <div class="article-meta"><ul class="authors-detail"><li><div><a>Test Author</a></div></li></ul></div>
            <div class="article-content"><div class="review-text"><div class="contents">
                <p>Opening.</p><p>Closing.</p>
            </div></div></div>
        </div>
        <ul class="genre-list"><li><a>Rock</a></li></ul>
        </body></html>"#,
        title, score
    )
}

/// Serves `body` for listing page `page`
pub async fn mount_listing(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves a one-album review page for `id`
pub async fn mount_review(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}/", CATALOG_PATH, id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(review_html(id, "8.1")))
        .mount(server)
        .await;
}

/// Creates a validated test configuration pointed at the mock server
pub fn create_test_config(server: &MockServer, first: u32, last: u32, out: &Path) -> Config {
    let mut config = Config::default();
    config.crawl.first_page = first;
    config.crawl.last_page = last;
    config.pages.workers = 2;
    config.pages.retry_delay_ms = 20;
    config.reviews.workers = 4;
    config.reviews.retry_delay_ms = 20;
    config.queue.capacity = 8;
    config.network.base_url = format!("{}{}", server.uri(), CATALOG_PATH);
    config.network.timeout_secs = 5;
    config.output.directory = out.join("reviews");
    config.output.database_path = out.join("reviews.db");

    validate(&config).expect("test config must be valid");
    config
}
