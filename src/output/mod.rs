//! JSON persistence of crawl results

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use tracing::info;

use crate::models::ProductRecord;

/// `<YYYY_MM_DD_HH_MM>_<address>_<suffix>.json`
#[must_use]
pub fn output_file_name<Tz: TimeZone>(
    timestamp: &DateTime<Tz>,
    address: Option<&str>,
    suffix: &str,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{suffix}.json",
        timestamp.format("%Y_%m_%d_%H_%M"),
        sanitize_address(address)
    )
}

/// Drops commas and turns spaces, dots and path separators into `_`.
fn sanitize_address(address: Option<&str>) -> String {
    match address.map(str::trim).filter(|a| !a.is_empty()) {
        Some(address) => address
            .chars()
            .filter(|c| *c != ',')
            .map(|c| match c {
                ' ' | '.' | '/' | '\\' => '_',
                c => c,
            })
            .collect(),
        None => "unknown".to_string(),
    }
}

/// Writes `products` as JSON into `dir`, creating it if needed, and returns
/// the written path.
///
/// # Errors
///
/// Fails if the directory cannot be created or the file cannot be written.
pub async fn save_products(
    dir: &Path,
    address: Option<&str>,
    suffix: &str,
    products: &[ProductRecord],
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let path = dir.join(output_file_name(&Local::now(), address, suffix));
    let body = serde_json::to_vec(products).context("failed to serialize products")?;
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), products = products.len(), "saved products");
    Ok(path)
}
