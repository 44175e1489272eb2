//! Full pipeline runs against a mock catalog

use crate::{
    create_test_config, listing_html, mount_listing, mount_review, review_html, CATALOG_PATH,
};
use pitchfork_dl::config::OutputFormat;
use pitchfork_dl::crawler::{crawl, Coordinator, HtmlExtractor, HttpFetcher};
use pitchfork_dl::storage::{JsonDirPersister, SqlitePersister};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_bounded_crawl_with_empty_page_retry() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_html(&["1-a", "1-b"])).await;

    // Page 2 is served empty once, then with one review
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&[])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(&server, 2, listing_html(&["2-a"])).await;

    for id in ["1-a", "1-b", "2-a"] {
        mount_review(&server, id).await;
    }

    let config = create_test_config(&server, 1, 3, out.path());
    let summary = tokio::time::timeout(
        Duration::from_secs(30),
        crawl(config, std::future::pending()),
    )
    .await
    .expect("crawl must terminate")
    .unwrap();

    assert!(!summary.interrupted);
    assert_eq!(summary.pages_emitted, 2);
    assert_eq!(summary.pages.retries, 1);
    assert_eq!(summary.reviews_saved(), 3);

    let persister = JsonDirPersister::open(out.path().join("reviews")).unwrap();
    for id in ["1-a", "1-b", "2-a"] {
        let review = persister.load(id).await.unwrap().unwrap();
        assert_eq!(review.id, id);
        assert_eq!(review.albums.len(), 1);
    }
}

#[tokio::test]
async fn test_unbounded_crawl_ends_at_missing_page() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_html(&["1-a"])).await;
    mount_listing(&server, 2, listing_html(&["2-a", "2-b"])).await;
    for id in ["1-a", "2-a", "2-b"] {
        mount_review(&server, id).await;
    }

    let mut config = create_test_config(&server, 1, 0, out.path());
    config.output.format = OutputFormat::Sqlite;

    let summary = tokio::time::timeout(
        Duration::from_secs(30),
        crawl(config, std::future::pending()),
    )
    .await
    .expect("unbounded crawl must stop at the first missing page")
    .unwrap();

    assert!(summary.pages.exhausted >= 1);
    assert_eq!(summary.pages.completed, 2);

    let db = SqlitePersister::open(&out.path().join("reviews.db")).unwrap();
    assert_eq!(db.count().unwrap(), 3);
}

#[tokio::test]
async fn test_failing_reviews_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_html(&["1-ok", "1-gone", "1-broken"])).await;
    mount_review(&server, "1-ok").await;
    Mock::given(method("GET"))
        .and(path("/reviews/albums/1-broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server, 1, 2, out.path());
    let summary = crawl(config, std::future::pending()).await.unwrap();

    assert_eq!(summary.reviews.completed, 1);
    assert_eq!(summary.reviews.abandoned, 2);
    assert!(out.path().join("reviews").join("1-ok.json").exists());
    assert!(!out.path().join("reviews").join("1-gone.json").exists());
}

#[tokio::test]
async fn test_interrupt_drains_both_stages() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_html(&["1-a", "1-b", "1-c"])).await;
    // Page 2 never lists anything, so the page stage only stops when told to
    mount_listing(&server, 2, listing_html(&[])).await;
    Mock::given(method("GET"))
        .and(path("/reviews/albums/1-a/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(review_html("1-a", "7.0"))
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&server)
        .await;
    mount_review(&server, "1-b").await;
    mount_review(&server, "1-c").await;

    let mut config = create_test_config(&server, 1, 3, out.path());
    config.reviews.workers = 1;

    let persister = Arc::new(JsonDirPersister::open(out.path().join("reviews")).unwrap());
    let coordinator = Coordinator::new(
        config.clone(),
        Arc::new(HttpFetcher::from_config(&config.network).unwrap()),
        Arc::new(HtmlExtractor::new().unwrap()),
        persister.clone(),
    );

    let interrupt = tokio::time::sleep(Duration::from_millis(300));
    let summary = tokio::time::timeout(Duration::from_secs(30), coordinator.run(interrupt))
        .await
        .expect("drain must finish")
        .unwrap();

    assert!(summary.interrupted);
    let timeline = summary.timeline;
    assert!(summary.pages.last_exit.unwrap() <= timeline.reviews_cancelled_at.unwrap());

    // The in-flight review finished and the queued ones were drained after it
    for id in ["1-a", "1-b", "1-c"] {
        assert!(persister.load(id).await.unwrap().is_some(), "{} not saved", id);
    }
    assert_eq!(summary.reviews.completed, 3);
    assert_eq!(summary.reviews_left_queued, 0);
}
