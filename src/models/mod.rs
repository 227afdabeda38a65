//! Data models for crawled catalog products

use std::ops::RangeInclusive;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product card scraped from a category listing, optionally enriched with
/// attributes from its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Site-assigned SKU, unique within a crawl
    pub id: i64,
    pub title: String,
    /// Absolute URL of the product detail page
    pub url: String,
    /// Non-discounted price. When the card shows a struck-through price,
    /// this is that price.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub regular_price: Option<Decimal>,
    /// Discounted price, present only when a struck-through price exists
    #[serde(with = "rust_decimal::serde::float_option")]
    pub promo_price: Option<Decimal>,
    /// Filled in by enrichment
    pub brand: Option<String>,
}

impl ProductRecord {
    /// Maps the `(current, previous)` prices of a card to the record's
    /// regular/promo pair.
    #[must_use]
    pub fn price_pair(
        actual: Option<Decimal>,
        old: Option<Decimal>,
    ) -> (Option<Decimal>, Option<Decimal>) {
        match old {
            Some(old) => (Some(old), actual),
            None => (actual, None),
        }
    }
}

/// Inclusive range of listing page numbers to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    min: u32,
    max: u32,
}

impl PageRange {
    /// Builds a range, swapping the bounds if they arrive reversed.
    #[must_use]
    pub fn new(min: u32, max: u32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// The range used when a listing has no pagination control.
    #[must_use]
    pub fn single() -> Self {
        Self { min: 1, max: 1 }
    }

    #[must_use]
    pub fn min(&self) -> u32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    #[must_use]
    pub fn pages(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self::single()
    }
}

/// Records extracted from one listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub page: u32,
    pub records: Vec<ProductRecord>,
    /// Cards that were present but could not be turned into a record
    pub skipped: usize,
}

/// What the first listing page tells us before the crawl fans out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub range: PageRange,
    /// Address of the selected store as shown in the site header
    pub address: Option<String>,
}

/// Final result of a category crawl.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub address: Option<String>,
    pub products: Vec<ProductRecord>,
}

impl CrawlOutcome {
    #[must_use]
    pub fn enriched_count(&self) -> usize {
        self.products.iter().filter(|p| p.brand.is_some()).count()
    }
}
