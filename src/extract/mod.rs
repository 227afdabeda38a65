//! # HTML field extraction
//!
//! Pure, synchronous parsing of catalog markup. Nothing in here touches the
//! network; callers hand in page bodies and get typed values back.
//!
//! ## Failure policy
//!
//! - **Prices** soft-fail: a missing price element or unparsable text yields
//!   `None`, never an error.
//! - **Cards** without a SKU or a link are skipped; a card without a name
//!   keeps an empty title.
//! - **Pagination** without a control or without numeric entries degrades to
//!   a single page.
//! - **Detail pages** without the attribute table or the brand row fail with
//!   [`CrawlError::AttributeNotFound`], which the enrichment stage absorbs.

use std::collections::HashMap;

use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::catalog_url::CatalogUrl;
use crate::error::{CrawlError, Result};
use crate::models::{Discovery, ListingPage, PageRange, ProductRecord};
use crate::traits::SiteConfig;

/// Compiled selectors for one site.
#[derive(Debug)]
pub struct Extractor {
    card: Selector,
    title: Selector,
    actual_price: Selector,
    old_price: Selector,
    link: Selector,
    pagination_container: Selector,
    pagination_item: Selector,
    attributes_list: Selector,
    attribute_item: Selector,
    address: Selector,
    sku_attribute: String,
    brand_label: String,
    attribute_separator: String,
}

impl Extractor {
    /// Compiles the site's selectors once, up front.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidSelector`] for the first selector that
    /// fails to parse.
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let s = &site.selectors;
        Ok(Self {
            card: compile(&s.product_card)?,
            title: compile(&s.title)?,
            actual_price: compile(&s.actual_price)?,
            old_price: compile(&s.old_price)?,
            link: compile(&s.link)?,
            pagination_container: compile(&s.pagination_container)?,
            pagination_item: compile(&s.pagination_item)?,
            attributes_list: compile(&s.attributes_list)?,
            attribute_item: compile(&s.attribute_item)?,
            address: compile(&s.address)?,
            sku_attribute: site.sku_attribute.clone(),
            brand_label: site.brand_label.trim().to_lowercase(),
            attribute_separator: site.attribute_separator.clone(),
        })
    }

    /// Reads the page range and store address from the first listing page.
    #[must_use]
    pub fn discovery(&self, html: &str) -> Discovery {
        let document = Html::parse_document(html);
        Discovery {
            range: self.pagination(&document),
            address: self.address(&document),
        }
    }

    /// Inclusive range spanning the smallest and largest numeric pagination
    /// entries. Non-numeric entries ("…", arrows) are ignored.
    #[must_use]
    pub fn pagination(&self, document: &Html) -> PageRange {
        let Some(control) = document.select(&self.pagination_container).next() else {
            return PageRange::single();
        };

        let numbers: Vec<u32> = control
            .select(&self.pagination_item)
            .filter_map(|item| {
                let text = element_text(item);
                if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                text.parse().ok()
            })
            .collect();

        match (numbers.iter().min(), numbers.iter().max()) {
            (Some(&min), Some(&max)) => PageRange::new(min, max),
            _ => PageRange::single(),
        }
    }

    #[must_use]
    pub fn address(&self, document: &Html) -> Option<String> {
        document
            .select(&self.address)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
    }

    /// Extracts every product card on a listing page.
    ///
    /// Cards that cannot become a record are counted in
    /// [`ListingPage::skipped`] and never fail the page.
    #[must_use]
    pub fn listing_page(&self, html: &str, page: u32, category: &CatalogUrl) -> ListingPage {
        let document = Html::parse_document(html);
        let mut listing = ListingPage {
            page,
            ..ListingPage::default()
        };

        for card in document.select(&self.card) {
            match self.card(card, category) {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    warn!(page, error = %e, "skipping product card");
                    listing.skipped += 1;
                }
            }
        }

        listing
    }

    /// Builds a record from one product card.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::MissingField`] when the card has no numeric SKU
    /// or no link.
    pub fn card(&self, card: ElementRef<'_>, category: &CatalogUrl) -> Result<ProductRecord> {
        let id = self.card_id(card)?;
        let href = self.card_link(card)?;
        let title = self.card_title(card).unwrap_or_else(|e| {
            warn!(id, error = %e, "product card has no name");
            String::new()
        });
        let (actual, old) = self.card_prices(card);
        let (regular_price, promo_price) = ProductRecord::price_pair(actual, old);

        Ok(ProductRecord {
            id,
            title,
            url: category.resolve_link(&href),
            regular_price,
            promo_price,
            brand: None,
        })
    }

    /// # Errors
    ///
    /// [`CrawlError::MissingField`] if the SKU attribute is absent or not an
    /// integer.
    pub fn card_id(&self, card: ElementRef<'_>) -> Result<i64> {
        card.value()
            .attr(&self.sku_attribute)
            .and_then(|sku| sku.trim().parse().ok())
            .ok_or(CrawlError::MissingField { field: "id" })
    }

    /// # Errors
    ///
    /// [`CrawlError::MissingField`] if the name element is absent.
    pub fn card_title(&self, card: ElementRef<'_>) -> Result<String> {
        card.select(&self.title)
            .next()
            .map(element_text)
            .ok_or(CrawlError::MissingField { field: "title" })
    }

    /// Current and struck-through prices, each `None` when missing or
    /// unparsable.
    #[must_use]
    pub fn card_prices(&self, card: ElementRef<'_>) -> (Option<Decimal>, Option<Decimal>) {
        let price = |selector: &Selector| {
            card.select(selector)
                .next()
                .and_then(|el| parse_price(&el.text().collect::<String>()))
        };
        (price(&self.actual_price), price(&self.old_price))
    }

    /// # Errors
    ///
    /// [`CrawlError::MissingField`] if the card contains no link with an
    /// `href`.
    pub fn card_link(&self, card: ElementRef<'_>) -> Result<String> {
        card.select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
            .ok_or(CrawlError::MissingField { field: "link" })
    }

    /// Label → value table of a detail page, labels lower-cased.
    /// `None` when the page has no attribute table.
    #[must_use]
    pub fn attributes(&self, html: &str) -> Option<HashMap<String, String>> {
        let document = Html::parse_document(html);
        let list = document.select(&self.attributes_list).next()?;

        let table = list
            .select(&self.attribute_item)
            .filter_map(|item| {
                let text = item.text().collect::<String>().replace('\n', "");
                let segments: Vec<&str> = text.trim().split(&self.attribute_separator).collect();
                let label = segments.first()?.trim().to_lowercase();
                let value = segments.last()?.trim().to_string();
                (!label.is_empty()).then_some((label, value))
            })
            .collect();

        Some(table)
    }

    /// Brand value from a detail page fetched from `url`.
    ///
    /// # Errors
    ///
    /// [`CrawlError::AttributeNotFound`] if the attribute table or the brand
    /// row is missing.
    pub fn brand(&self, html: &str, url: &str) -> Result<String> {
        self.attributes(html)
            .and_then(|mut table| table.remove(&self.brand_label))
            .ok_or_else(|| CrawlError::AttributeNotFound {
                attribute: self.brand_label.clone(),
                url: url.to_string(),
            })
    }
}

/// Strips everything but digits and `.` and parses the rest as a decimal.
#[must_use]
pub fn parse_price(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}
