use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::catalog_url::{CatalogUrl, QueryParams};
use crate::error::Result;
use crate::extract::Extractor;
use crate::models::{CrawlOutcome, Discovery, ListingPage, PageRange, ProductRecord};
use crate::scraper::{DEFAULT_TIMEOUT, HttpFetcher, RequestContext};
use crate::traits::{PageFetcher, SiteConfig};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Listing-stage lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Discovering,
    Crawling,
    Aggregated,
    Failed,
}

/// Everything one category crawl needs.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Category listing URL; any query it carries is discarded
    pub category_url: String,
    pub context: RequestContext,
    /// Upper bound on in-flight requests per stage
    pub max_concurrency: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl CrawlOptions {
    #[must_use]
    pub fn new(category_url: impl Into<String>, context: RequestContext) -> Self {
        Self {
            category_url: category_url.into(),
            context,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Crawls one category: pagination discovery, concurrent listing pages,
/// then concurrent detail-page enrichment.
pub struct CatalogCrawler<F> {
    fetcher: F,
    extractor: Extractor,
    category: CatalogUrl,
    in_stock: bool,
    max_concurrency: usize,
    state: CrawlState,
}

impl<F: PageFetcher> CatalogCrawler<F> {
    /// # Errors
    ///
    /// [`crate::CrawlError::InvalidUrl`] for a malformed category URL and
    /// [`crate::CrawlError::InvalidSelector`] for a bad site profile. Both
    /// are raised before any request is made.
    pub fn new(fetcher: F, site: &SiteConfig, category_url: &str, in_stock: bool) -> Result<Self> {
        let mut category = CatalogUrl::parse(category_url)?;
        category.set_query(&QueryParams::new());

        Ok(Self {
            fetcher,
            extractor: Extractor::new(site)?,
            category,
            in_stock,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            state: CrawlState::Idle,
        })
    }

    /// Caps in-flight requests per stage; values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn state(&self) -> CrawlState {
        self.state
    }

    #[must_use]
    pub fn category(&self) -> &CatalogUrl {
        &self.category
    }

    /// URL of listing page `page`, with the stock filter when enabled.
    #[must_use]
    pub fn page_url(&self, page: u32) -> CatalogUrl {
        let mut params = QueryParams::new().with("page", page);
        if self.in_stock {
            params = params.with("in_stock", 1);
        }
        self.category.with_query(&params)
    }

    /// Fetches page 1 and reads the page range and store address from it.
    ///
    /// # Errors
    ///
    /// Transport-class errors from the fetcher.
    pub async fn discover(&self) -> Result<Discovery> {
        let url = self.page_url(1);
        let html = self.fetcher.fetch_html(url.as_str()).await?;
        let discovery = self.extractor.discovery(&html);

        info!(
            first = discovery.range.min(),
            last = discovery.range.max(),
            address = discovery.address.as_deref().unwrap_or("unknown"),
            "discovered pagination"
        );
        Ok(discovery)
    }

    /// Fetches one listing page and extracts its product cards.
    ///
    /// # Errors
    ///
    /// Transport-class errors from the fetcher. Bad cards never fail the page.
    pub async fn fetch_listing_page(&self, page: u32) -> Result<ListingPage> {
        let url = self.page_url(page);
        let html = self.fetcher.fetch_html(url.as_str()).await?;
        let listing = self.extractor.listing_page(&html, page, &self.category);

        info!(
            page,
            records = listing.records.len(),
            skipped = listing.skipped,
            "parsed listing page"
        );
        Ok(listing)
    }

    /// Fetches every page of `range` concurrently and flattens the records.
    ///
    /// The first failing page aborts the whole stage; the remaining in-flight
    /// requests are dropped with it. Record order across pages is unspecified.
    ///
    /// # Errors
    ///
    /// The first transport-class error from any page.
    pub async fn crawl_pages(&self, range: PageRange) -> Result<Vec<ProductRecord>> {
        let pages: Vec<ListingPage> = stream::iter(range.pages())
            .map(|page| self.fetch_listing_page(page))
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        Ok(pages.into_iter().flat_map(|page| page.records).collect())
    }

    /// Runs discovery and the listing stage, tracking [`CrawlState`].
    ///
    /// # Errors
    ///
    /// Any transport-class error; no partial record list is returned.
    pub async fn collect_listing(&mut self) -> Result<(Discovery, Vec<ProductRecord>)> {
        let started = Instant::now();

        self.transition(CrawlState::Discovering);
        let discovery = match self.discover().await {
            Ok(discovery) => discovery,
            Err(e) => {
                self.transition(CrawlState::Failed);
                return Err(e);
            }
        };

        self.transition(CrawlState::Crawling);
        let records = match self.crawl_pages(discovery.range).await {
            Ok(records) => records,
            Err(e) => {
                self.transition(CrawlState::Failed);
                return Err(e);
            }
        };

        self.transition(CrawlState::Aggregated);
        info!(
            pages = discovery.range.page_count(),
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "listing stage complete"
        );
        Ok((discovery, records))
    }

    /// Resolves the brand of every record from its detail page, concurrently
    /// and in place. Each record is touched by exactly one task.
    ///
    /// Failures are per record: the record keeps `brand: None` and the rest of
    /// the batch carries on. Returns how many records now have a brand.
    pub async fn enrich(&self, records: &mut [ProductRecord]) -> usize {
        let started = Instant::now();

        stream::iter(records.iter_mut())
            .for_each_concurrent(self.max_concurrency, |record| async move {
                let brand = self.fetch_brand(&record.url).await;
                match brand {
                    Ok(brand) => record.brand = Some(brand),
                    Err(e) => {
                        warn!(id = record.id, url = %record.url, error = %e, "brand not resolved");
                    }
                }
            })
            .await;

        let enriched = records.iter().filter(|r| r.brand.is_some()).count();
        info!(
            records = records.len(),
            enriched,
            elapsed_ms = started.elapsed().as_millis(),
            "enrichment stage complete"
        );
        enriched
    }

    async fn fetch_brand(&self, url: &str) -> Result<String> {
        let html = self.fetcher.fetch_html(url).await?;
        self.extractor.brand(&html, url)
    }

    fn transition(&mut self, next: CrawlState) {
        debug!(from = ?self.state, to = ?next, "crawl state");
        self.state = next;
    }
}

/// Runs the full pipeline for one category over a fresh HTTP session.
///
/// The session lives exactly as long as this call and is released on every
/// exit path.
///
/// # Errors
///
/// [`crate::CrawlError::InvalidUrl`] before any request, or a transport-class
/// error from the listing stage. Enrichment failures are absorbed.
pub async fn crawl_category(options: &CrawlOptions, site: &SiteConfig) -> Result<CrawlOutcome> {
    let fetcher = HttpFetcher::new(&options.context, options.timeout)?;
    let mut crawler = CatalogCrawler::new(
        fetcher,
        site,
        &options.category_url,
        options.context.in_stock(),
    )?
    .with_max_concurrency(options.max_concurrency);

    info!(
        site = %site.name,
        category = %crawler.category(),
        store_id = options.context.store_id(),
        in_stock = options.context.in_stock(),
        max_concurrency = options.max_concurrency,
        "starting crawl"
    );

    let (discovery, mut products) = crawler.collect_listing().await?;
    crawler.enrich(&mut products).await;

    Ok(CrawlOutcome {
        address: discovery.address,
        products,
    })
}
