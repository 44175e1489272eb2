//! Catalog URL handling
//!
//! Builds listing and review URLs from the configured catalog root and
//! derives review identifiers from the hrefs found on listing pages.

use crate::ConfigError;
use url::Url;

/// URL builder for one review catalog
#[derive(Debug, Clone)]
pub struct CatalogUrls {
    base: Url,
}

impl CatalogUrls {
    /// Creates a builder rooted at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Catalog root, e.g. `https://pitchfork.com/reviews/albums/`
    ///
    /// # Returns
    ///
    /// * `Ok(CatalogUrls)` - The base parsed
    /// * `Err(ConfigError::InvalidUrl)` - The base is not an absolute URL
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "Invalid base_url: {} has no path to append to",
                base_url
            )));
        }
        Ok(Self { base })
    }

    /// Listing page URL: `<base>?page=N`
    pub fn listing(&self, page: u32) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("page", &page.to_string());
        url
    }

    /// Review URL: `<base><id>/`
    ///
    /// The identifier is appended as a single percent-encoded path segment,
    /// so it can never be read as a scheme, a query or another path.
    pub fn review(&self, review_id: &str) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(review_id).push("");
        }
        url
    }
}

/// Derives a review identifier from a listing href
///
/// Both relative (`/reviews/albums/12345-title/`) and absolute hrefs are
/// accepted; the identifier is the last non-empty path segment. Returns `None`
/// when no key-safe identifier can be derived.
///
/// # Examples
///
/// ```
/// use pitchfork_dl::url::review_id_from_href;
///
/// assert_eq!(
///     review_id_from_href("/reviews/albums/12345-some-title/"),
///     Some("12345-some-title".to_string())
/// );
/// assert_eq!(review_id_from_href("/"), None);
/// ```
pub fn review_id_from_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    // Relative hrefs are resolved against a throwaway origin so that query
    // strings and fragments are split off the path the same way in both cases
    let parsed = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://catalog.invalid/").ok()?.join(href).ok()?
        }
        Err(_) => return None,
    };

    let segment = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?
        .to_string();

    if is_key_safe(&segment) {
        Some(segment)
    } else {
        None
    }
}

/// Returns true if `id` can be used verbatim as a file name or database key
/// on every platform
pub fn is_key_safe(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogUrls {
        CatalogUrls::new("https://pitchfork.com/reviews/albums/").unwrap()
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            catalog().listing(7).as_str(),
            "https://pitchfork.com/reviews/albums/?page=7"
        );
    }

    #[test]
    fn test_review_url() {
        assert_eq!(
            catalog().review("22735-blonde").as_str(),
            "https://pitchfork.com/reviews/albums/22735-blonde/"
        );
    }

    #[test]
    fn test_review_url_keeps_id_in_one_segment() {
        assert_eq!(
            catalog().review("abc:def").as_str(),
            "https://pitchfork.com/reviews/albums/abc:def/"
        );
        assert_eq!(
            catalog().review("a/b?c").as_str(),
            "https://pitchfork.com/reviews/albums/a%2Fb%3Fc/"
        );
    }

    #[test]
    fn test_review_url_without_trailing_slash_on_base() {
        let urls = CatalogUrls::new("https://pitchfork.com/reviews/albums?sort=new").unwrap();
        assert_eq!(
            urls.review("1-a").as_str(),
            "https://pitchfork.com/reviews/albums/1-a/"
        );
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            CatalogUrls::new("mailto:reviews@example.com"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            CatalogUrls::new("reviews/albums/"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_review_id_from_relative_href() {
        assert_eq!(
            review_id_from_href("/reviews/albums/22735-blonde/"),
            Some("22735-blonde".to_string())
        );
        assert_eq!(
            review_id_from_href("/reviews/albums/22735-blonde"),
            Some("22735-blonde".to_string())
        );
    }

    #[test]
    fn test_review_id_from_absolute_href() {
        assert_eq!(
            review_id_from_href("https://pitchfork.com/reviews/albums/1-a/?utm=x#top"),
            Some("1-a".to_string())
        );
    }

    #[test]
    fn test_review_id_ignores_query_and_fragment() {
        assert_eq!(
            review_id_from_href("/reviews/albums/9-b/?ref=list"),
            Some("9-b".to_string())
        );
    }

    #[test]
    fn test_review_id_rejects_empty() {
        assert_eq!(review_id_from_href(""), None);
        assert_eq!(review_id_from_href("   "), None);
        assert_eq!(review_id_from_href("/"), None);
    }

    #[test]
    fn test_review_id_rejects_colon() {
        assert_eq!(review_id_from_href("/reviews/albums/abc:def/"), None);
    }

    #[test]
    fn test_is_key_safe() {
        assert!(is_key_safe("22735-blonde"));
        assert!(!is_key_safe(""));
        assert!(!is_key_safe("."));
        assert!(!is_key_safe(".."));
        assert!(!is_key_safe("a/b"));
        assert!(!is_key_safe("a\\b"));
        assert!(!is_key_safe("a\0b"));
        assert!(!is_key_safe("abc:def"));
    }
}
