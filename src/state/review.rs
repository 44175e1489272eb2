//! Structured review records
//!
//! A `Review` is built by the extractor from one review page, handed to the
//! persister, and dropped. It is never shared between workers.

use serde::{Deserialize, Serialize};

/// One album covered by a review (a review may cover several)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub artists: Vec<String>,
    pub title: String,
    pub score: String,
    pub labels: Vec<String>,
    pub year: String,
}

/// A review page, as persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review identifier (the persisted key)
    pub id: String,
    pub albums: Vec<Album>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    /// Review body, paragraphs separated by a blank line. Stored under the
    /// capitalised key that existing review archives use.
    #[serde(rename = "Article")]
    pub article: String,
}

impl Review {
    /// A review without albums carries nothing worth persisting
    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    /// One log line per album
    pub fn summary_lines(&self) -> Vec<String> {
        self.albums
            .iter()
            .map(|album| {
                format!(
                    "Review ID: {} | Artists: {} | Title: {} | Score: {} | Year: {} | Authors: {} | Genres: {}",
                    self.id,
                    album.artists.join("/"),
                    album.title,
                    album.score,
                    album.year,
                    self.authors.join("/"),
                    self.genres.join("/"),
                )
            })
            .collect()
    }
}

/// Result of extracting one review page
///
/// `Empty` means the page was fetched and parsed but held no albums, which the
/// review stage treats as transient and retries. It is not a parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlResult {
    Record(Review),
    Empty,
}

impl CrawlResult {
    /// Wraps a review, mapping an album-less review to `Empty`
    pub fn from_review(review: Review) -> Self {
        if review.is_empty() {
            Self::Empty
        } else {
            Self::Record(review)
        }
    }
}
