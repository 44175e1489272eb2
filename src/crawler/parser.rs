//! HTML extraction for listing pages and review pages
//!
//! This module turns raw document bodies into:
//! - The ordered review identifiers listed on a catalog page
//! - A structured `Review` for a review page
//!
//! Extraction is pure and synchronous; the stages call it between awaits.

use crate::state::{Album, CrawlResult, Review};
use crate::url::review_id_from_href;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while extracting data from a body
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Turns fetched bodies into identifiers and records
pub trait Extractor: Send + Sync {
    /// Returns the review identifiers on a listing page, in document order.
    /// An empty vector is a valid result, not an error.
    fn extract_page_items(&self, body: &str) -> Result<Vec<String>, ExtractError>;

    /// Returns the review on a review page, or `CrawlResult::Empty` when the
    /// page carries no albums
    fn extract_review(&self, review_id: &str, body: &str) -> Result<CrawlResult, ExtractError>;
}

/// Compiled selectors for the catalog's markup
#[derive(Debug)]
pub struct HtmlExtractor {
    listing_review: Selector,
    first_link: Selector,
    album_row: Selector,
    artist: Selector,
    title: Selector,
    score: Selector,
    label: Selector,
    year: Selector,
    author: Selector,
    genre: Selector,
    paragraph: Selector,
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

impl HtmlExtractor {
    /// Compiles all selectors
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlExtractor)` - Ready to extract
    /// * `Err(ExtractError::Selector)` - A selector failed to compile
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            listing_review: compile("div.fragment-list div.review")?,
            first_link: compile("a[href]")?,
            album_row: compile("div.review-detail article div.tombstone div.row")?,
            artist: compile("h2.artists ul.artist-list li a")?,
            title: compile("h1.review-title")?,
            score: compile("div.score-box div.score-circle span.score")?,
            label: compile("div.album-art div.labels-and-years ul.label-list li")?,
            year: compile("div.album-art div.labels-and-years span.year")?,
            author: compile("div.review-body div.article-meta ul.authors-detail li div a")?,
            genre: compile("ul.genre-list li a")?,
            paragraph: compile(
                "div.review-body div.article-content div.review-text div.contents p",
            )?,
        })
    }

    fn parse_album(&self, row: ElementRef<'_>) -> Album {
        let year = first_text(row, &self.year);

        Album {
            artists: all_text(row, &self.artist),
            title: first_text(row, &self.title),
            score: first_text(row, &self.score),
            labels: all_text(row, &self.label),
            year: year
                .trim_start_matches(|c: char| c == '•' || c.is_whitespace())
                .to_string(),
        }
    }
}

impl Extractor for HtmlExtractor {
    fn extract_page_items(&self, body: &str) -> Result<Vec<String>, ExtractError> {
        let document = Html::parse_document(body);
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for review in document.select(&self.listing_review) {
            let href = review
                .select(&self.first_link)
                .next()
                .and_then(|link| link.value().attr("href"));

            let Some(href) = href else {
                continue;
            };

            match review_id_from_href(href) {
                Some(id) => {
                    if seen.insert(id.clone()) {
                        ids.push(id);
                    }
                }
                None => tracing::debug!("Skipping unusable review link '{}'", href),
            }
        }

        Ok(ids)
    }

    fn extract_review(&self, review_id: &str, body: &str) -> Result<CrawlResult, ExtractError> {
        let document = Html::parse_document(body);
        let root = document.root_element();

        let albums = document
            .select(&self.album_row)
            .map(|row| self.parse_album(row))
            .collect();

        let article = all_text(root, &self.paragraph).join("\n\n");

        let review = Review {
            id: review_id.to_string(),
            albums,
            authors: all_text(root, &self.author),
            genres: all_text(root, &self.genre),
            article,
        };

        Ok(CrawlResult::from_review(review))
    }
}

/// Trimmed text of every match under `scope`
fn all_text(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Trimmed text of the first match under `scope`, or an empty string
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
