//! Traits and site descriptions for catalog crawling

use async_trait::async_trait;

use crate::error::Result;

/// Markup description of a catalog site
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Display name for the website
    pub name: String,
    /// CSS selectors for extracting data
    pub selectors: SiteSelectors,
    /// Attribute element on a product card carrying the SKU
    pub sku_attribute: String,
    /// Lower-cased label of the brand row in the detail-page attribute table
    pub brand_label: String,
    /// Separator between label and value inside an attribute row's text
    pub attribute_separator: String,
    /// Trailing component of saved result file names
    pub output_suffix: String,
}

/// CSS selectors for the parts of listing and detail pages we read
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// One product card on a listing page
    pub product_card: String,
    /// Product name within a card
    pub title: String,
    /// Current price within a card
    pub actual_price: String,
    /// Struck-through price within a card
    pub old_price: String,
    /// Product link within a card
    pub link: String,
    /// Pagination control on a listing page
    pub pagination_container: String,
    /// Page entries within the pagination control
    pub pagination_item: String,
    /// Attribute table on a detail page
    pub attributes_list: String,
    /// One row of the attribute table
    pub attribute_item: String,
    /// Store address shown in the page header
    pub address: String,
}

/// Source of raw page HTML.
///
/// The crawler only ever needs "GET this URL and give me the body"; the
/// request context (headers, cookies, timeouts) belongs to the implementor.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the body of `url`.
    ///
    /// # Errors
    ///
    /// Returns a transport-class [`crate::CrawlError`] on network failure or
    /// a non-success status.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}
