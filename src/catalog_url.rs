//! Query-string manipulation for category listing URLs.
//!
//! Listing pages are addressed by rewriting the query of the category URL
//! (`page`, `in_stock`) while scheme, host, path and fragment stay as the
//! user supplied them.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{CrawlError, Result};

/// Ordered, multi-valued query parameters.
///
/// Keys keep their first-seen position; inserting an existing key replaces
/// all of its values in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`QueryParams::insert`] for a single value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, vec![value.to_string()]);
        self
    }

    #[must_use]
    pub fn with_values<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.insert(key, values.into_iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        if let Some(slot) = self.pairs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = values;
        } else {
            self.pairs.push((key, values));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.iter().all(|(_, values)| values.is_empty())
    }

    /// Merges `other` into `self`; keys present in `other` win.
    pub fn merge(&mut self, other: &Self) {
        for (key, values) in &other.pairs {
            self.insert(key.clone(), values.clone());
        }
    }

    fn from_url(url: &Url) -> Self {
        let mut params = Self::new();
        for (key, value) in url.query_pairs() {
            if let Some(slot) = params.pairs.iter_mut().find(|(k, _)| *k == key) {
                slot.1.push(value.into_owned());
            } else {
                params.pairs.push((key.into_owned(), vec![value.into_owned()]));
            }
        }
        params
    }

    fn flattened(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
    }
}

/// An absolute `http`/`https` URL whose query can be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUrl {
    url: Url,
}

impl CatalogUrl {
    /// Parses an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidUrl`] when the input does not parse, is not
    /// `http`/`https`, or has no host.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: String| CrawlError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self { url })
    }

    /// Merges `params` into the existing query string.
    pub fn update_query(&mut self, params: &QueryParams) {
        let mut merged = QueryParams::from_url(&self.url);
        merged.merge(params);
        self.write_query(&merged);
    }

    /// Replaces the whole query string with `params`.
    pub fn set_query(&mut self, params: &QueryParams) {
        self.write_query(params);
    }

    /// Copy of this URL with its query replaced by `params`.
    #[must_use]
    pub fn with_query(&self, params: &QueryParams) -> Self {
        let mut url = self.clone();
        url.set_query(params);
        url
    }

    #[must_use]
    pub fn query(&self) -> QueryParams {
        QueryParams::from_url(&self.url)
    }

    /// Scheme and host (plus a non-default port), without a trailing slash.
    #[must_use]
    pub fn root_url(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// Turns a product `href` from listing markup into an absolute URL.
    #[must_use]
    pub fn resolve_link(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{href}", self.root_url())
        } else {
            format!("{}/{href}", self.root_url())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    fn write_query(&mut self, params: &QueryParams) {
        self.url.set_query(None);
        if params.is_empty() {
            return;
        }
        self.url.query_pairs_mut().extend_pairs(params.flattened());
    }
}

impl FromStr for CatalogUrl {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CatalogUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORY: &str = "https://online.metro-cc.ru/category/molochnye-prodkuty?sort=price#top";

    #[test]
    fn update_query_merges_into_existing_params() {
        let mut url = CatalogUrl::parse(CATEGORY).unwrap();
        url.update_query(&QueryParams::new().with("page", 3));
        assert_eq!(
            url.as_str(),
            "https://online.metro-cc.ru/category/molochnye-prodkuty?sort=price&page=3#top"
        );
    }

    #[test]
    fn update_query_replaces_existing_key_in_place() {
        let mut url = CatalogUrl::parse("https://example.com/c?page=1&in_stock=1").unwrap();
        url.update_query(&QueryParams::new().with("page", 7));
        assert_eq!(url.as_str(), "https://example.com/c?page=7&in_stock=1");
    }

    #[test]
    fn update_query_is_idempotent() {
        let params = QueryParams::new().with("page", 2).with("in_stock", 1);
        let mut once = CatalogUrl::parse(CATEGORY).unwrap();
        once.update_query(&params);
        let mut twice = once.clone();
        twice.update_query(&params);
        assert_eq!(once, twice);
    }

    #[test]
    fn update_query_with_blank_value_is_idempotent() {
        let params = QueryParams::new().with("q", "").with("b", 2);
        let mut once = CatalogUrl::parse("https://e.com/c?a=1").unwrap();
        once.update_query(&params);
        assert_eq!(once.as_str(), "https://e.com/c?a=1&q=&b=2");

        let mut twice = once.clone();
        twice.update_query(&params);
        assert_eq!(once, twice);
    }

    #[test]
    fn update_query_keeps_scheme_host_and_path() {
        let mut url = CatalogUrl::parse("http://shop.test:8080/a/b/c?x=1").unwrap();
        url.update_query(&QueryParams::new().with("y", "2"));
        let parsed = Url::parse(url.as_str()).unwrap();
        assert_eq!(parsed.scheme(), "http");
        assert_eq!(parsed.host_str(), Some("shop.test"));
        assert_eq!(parsed.port(), Some(8080));
        assert_eq!(parsed.path(), "/a/b/c");
    }

    #[test]
    fn set_query_discards_existing_params() {
        let mut url = CatalogUrl::parse(CATEGORY).unwrap();
        url.set_query(&QueryParams::new().with("page", 1));
        assert_eq!(
            url.as_str(),
            "https://online.metro-cc.ru/category/molochnye-prodkuty?page=1#top"
        );
    }

    #[test]
    fn set_query_with_empty_params_removes_question_mark() {
        let mut url = CatalogUrl::parse("https://example.com/c?a=1").unwrap();
        url.set_query(&QueryParams::new());
        assert_eq!(url.as_str(), "https://example.com/c");
    }

    #[test]
    fn values_are_percent_encoded() {
        let mut url = CatalogUrl::parse("https://example.com/search").unwrap();
        url.set_query(&QueryParams::new().with("q", "сыр & масло"));
        assert_eq!(
            url.as_str(),
            "https://example.com/search?q=%D1%81%D1%8B%D1%80+%26+%D0%BC%D0%B0%D1%81%D0%BB%D0%BE"
        );
        assert_eq!(url.query().get("q"), Some(&["сыр & масло".to_string()][..]));
    }

    #[test]
    fn multi_valued_params_are_repeated() {
        let mut url = CatalogUrl::parse("https://example.com/c?brand=a&brand=b").unwrap();
        assert_eq!(
            url.query().get("brand"),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        url.update_query(&QueryParams::new().with_values("brand", ["x", "y", "z"]));
        assert_eq!(url.as_str(), "https://example.com/c?brand=x&brand=y&brand=z");
    }

    #[test]
    fn root_url_is_scheme_and_host_only() {
        let url = CatalogUrl::parse(CATEGORY).unwrap();
        assert_eq!(url.root_url(), "https://online.metro-cc.ru");

        let local = CatalogUrl::parse("http://127.0.0.1:4321/category?page=2").unwrap();
        assert_eq!(local.root_url(), "http://127.0.0.1:4321");
    }

    #[test]
    fn resolve_link_prefixes_relative_hrefs() {
        let url = CatalogUrl::parse(CATEGORY).unwrap();
        assert_eq!(
            url.resolve_link("/products/moloko-1"),
            "https://online.metro-cc.ru/products/moloko-1"
        );
        assert_eq!(
            url.resolve_link("products/moloko-1"),
            "https://online.metro-cc.ru/products/moloko-1"
        );
        assert_eq!(
            url.resolve_link("https://cdn.example.com/p/1"),
            "https://cdn.example.com/p/1"
        );
    }

    #[test]
    fn malformed_urls_are_rejected() {
        for raw in ["not a url", "/category/relative", "ftp://example.com/c", ""] {
            let err = CatalogUrl::parse(raw).unwrap_err();
            assert!(
                matches!(err, CrawlError::InvalidUrl { .. }),
                "expected InvalidUrl for {raw:?}, got {err:?}"
            );
        }
    }
}
