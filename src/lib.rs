//! Two-stage catalog crawler: concurrent listing pages, then concurrent
//! detail-page enrichment.

pub mod catalog_crawler;
pub mod catalog_url;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod output;
pub mod scraper;
pub mod scrapers;
pub mod traits;

pub use crate::catalog_crawler::{CatalogCrawler, CrawlOptions, CrawlState, crawl_category};
pub use crate::catalog_url::{CatalogUrl, QueryParams};
pub use crate::error::CrawlError;
pub use crate::models::{CrawlOutcome, PageRange, ProductRecord};
pub use crate::scraper::{HttpFetcher, RequestContext};
pub use crate::traits::{PageFetcher, SiteConfig};
