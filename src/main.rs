use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use catalog_crawler::config::{Settings, StoreDirectory, timeout_from_secs};
use catalog_crawler::scrapers::metro;
use catalog_crawler::{CrawlOptions, RequestContext, crawl_category, output};

#[derive(Debug, Parser)]
#[command(name = "catalog-crawler", version)]
#[command(about = "Crawl a Metro category into a JSON product list")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crawl every page of a category and enrich products with their brand
    Crawl {
        /// Category listing URL
        #[arg(value_name = "URL")]
        url: String,

        /// Store whose assortment and prices are crawled
        #[arg(long, value_name = "ID")]
        store_id: u32,

        /// Only list products currently in stock
        #[arg(long, default_value_t = false)]
        in_stock: bool,

        /// Maximum in-flight requests per stage
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Per-request timeout
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,

        /// Directory for the result file
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// List known stores and their ids
    Stores {
        /// Only show stores in this city
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Crawl {
            url,
            store_id,
            in_stock,
            concurrency,
            timeout_secs,
            output_dir,
        } => {
            let options = CrawlOptions {
                category_url: url,
                context: RequestContext::metro(store_id, in_stock),
                max_concurrency: concurrency.unwrap_or(settings.max_concurrency).max(1),
                timeout: timeout_secs.map_or(settings.timeout, timeout_from_secs),
            };
            let save_dir = output_dir.unwrap_or_else(|| settings.save_path.clone());
            crawl(&options, &settings, &save_dir).await
        }
        Command::Stores { city } => {
            let directory = StoreDirectory::load(&settings.stores_file)?;
            print_stores(&directory, city.as_deref());
            Ok(())
        }
    }
}

async fn crawl(options: &CrawlOptions, settings: &Settings, save_dir: &Path) -> Result<()> {
    match StoreDirectory::load(&settings.stores_file) {
        Ok(directory) => match directory.find(options.context.store_id()) {
            Some((city, store)) => info!(city, address = %store.address, "selected store"),
            None => warn!(
                store_id = options.context.store_id(),
                "store id is not in the store directory"
            ),
        },
        Err(e) => warn!(error = %e, "store directory unavailable"),
    }

    let site = metro::site_config();
    let outcome = match crawl_category(options, &site).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "crawl failed, nothing saved");
            return Err(e.into());
        }
    };

    info!(
        products = outcome.products.len(),
        with_brand = outcome.enriched_count(),
        "crawl finished"
    );

    let path = output::save_products(
        save_dir,
        outcome.address.as_deref(),
        &site.output_suffix,
        &outcome.products,
    )
    .await?;
    println!("Saved {} products to {}", outcome.products.len(), path.display());
    Ok(())
}

fn print_stores(directory: &StoreDirectory, city: Option<&str>) {
    if directory.is_empty() {
        println!("No stores configured");
        return;
    }

    for (name, stores) in directory.cities() {
        if city.is_some_and(|c| c.to_lowercase() != name.to_lowercase()) {
            continue;
        }
        println!("{name}");
        for store in stores {
            println!("    ID {:>5} | {}", store.store_id, store.address);
        }
        println!();
    }
}
