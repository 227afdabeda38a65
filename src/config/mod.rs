//! # Configuration
//!
//! Runtime settings come from the environment (a `.env` file is loaded by
//! `main` through `dotenvy`). CLI flags override them.
//!
//! ## Environment Variables
//!
//! - `CRAWLER_SAVE_PATH`: directory for result files (default `jsons`)
//! - `CRAWLER_STORES_FILE`: store directory JSON (default `configs/stores.json`)
//! - `CRAWLER_MAX_CONCURRENCY`: in-flight request cap per stage (default 8)
//! - `CRAWLER_TIMEOUT_SECS`: per-request timeout (default 30)
//!
//! ## Store Directory
//!
//! The stores file is a JSON array of `{"city", "name", "store_id"}` objects.
//! It is only used to show the user which store ids exist; the crawler itself
//! needs nothing but the id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog_crawler::DEFAULT_MAX_CONCURRENCY;
use crate::scraper::DEFAULT_TIMEOUT;

pub const SAVE_PATH_VAR: &str = "CRAWLER_SAVE_PATH";
pub const STORES_FILE_VAR: &str = "CRAWLER_STORES_FILE";
pub const MAX_CONCURRENCY_VAR: &str = "CRAWLER_MAX_CONCURRENCY";
pub const TIMEOUT_SECS_VAR: &str = "CRAWLER_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub save_path: PathBuf,
    pub stores_file: PathBuf,
    pub max_concurrency: usize,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("jsons"),
            stores_file: PathBuf::from("configs/stores.json"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if a numeric variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset
    /// or blank variables.
    ///
    /// # Errors
    ///
    /// Fails if a numeric variable is set but does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_concurrency = match var(MAX_CONCURRENCY_VAR) {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| {
                    format!("{MAX_CONCURRENCY_VAR} must be a positive integer, got {v:?}")
                })?
                .max(1),
            None => defaults.max_concurrency,
        };

        let timeout = match var(TIMEOUT_SECS_VAR) {
            Some(v) => timeout_from_secs(v.trim().parse::<u64>().with_context(|| {
                format!("{TIMEOUT_SECS_VAR} must be a number of seconds, got {v:?}")
            })?),
            None => defaults.timeout,
        };

        Ok(Self {
            save_path: var(SAVE_PATH_VAR).map_or(defaults.save_path, PathBuf::from),
            stores_file: var(STORES_FILE_VAR).map_or(defaults.stores_file, PathBuf::from),
            max_concurrency,
            timeout,
        })
    }
}

/// One store within a city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub address: String,
    pub store_id: u32,
}

#[derive(Debug, Deserialize)]
struct RawStore {
    city: String,
    name: String,
    store_id: u32,
}

/// Stores grouped by city.
#[derive(Debug, Clone, Default)]
pub struct StoreDirectory {
    cities: BTreeMap<String, Vec<StoreEntry>>,
}

impl StoreDirectory {
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid store list.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store directory {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("failed to parse store directory {}", path.display()))
    }

    /// # Errors
    ///
    /// Fails if `json` is not an array of `{city, name, store_id}` objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let stores: Vec<RawStore> = serde_json::from_str(json)?;

        let mut cities: BTreeMap<String, Vec<StoreEntry>> = BTreeMap::new();
        for store in stores {
            cities.entry(store.city).or_default().push(StoreEntry {
                address: store.name,
                store_id: store.store_id,
            });
        }
        Ok(Self { cities })
    }

    pub fn cities(&self) -> impl Iterator<Item = (&str, &[StoreEntry])> {
        self.cities
            .iter()
            .map(|(city, stores)| (city.as_str(), stores.as_slice()))
    }

    #[must_use]
    pub fn city(&self, name: &str) -> Option<&[StoreEntry]> {
        self.cities.get(name).map(Vec::as_slice)
    }

    /// City and entry for `store_id`.
    #[must_use]
    pub fn find(&self, store_id: u32) -> Option<(&str, &StoreEntry)> {
        self.cities().find_map(|(city, stores)| {
            stores
                .iter()
                .find(|s| s.store_id == store_id)
                .map(|store| (city, store))
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Per-request timeout for `secs` seconds; 0 is raised to 1 so requests
/// cannot time out before they are sent.
#[must_use]
pub fn timeout_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const STORES: &str = r#"[
        {"city": "Москва", "name": "Ленинградское ш., 71Г", "store_id": 10},
        {"city": "Санкт-Петербург", "name": "Комендантский пр., 3", "store_id": 15},
        {"city": "Москва", "name": "Дмитровское ш., 165Б", "store_id": 11}
    ]"#;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn settings_default_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn settings_read_from_variables() {
        let settings = Settings::from_lookup(lookup(&[
            (SAVE_PATH_VAR, "/tmp/out"),
            (STORES_FILE_VAR, "/etc/stores.json"),
            (MAX_CONCURRENCY_VAR, " 16 "),
            (TIMEOUT_SECS_VAR, "5"),
        ]))
        .unwrap();
        assert_eq!(settings.save_path, PathBuf::from("/tmp/out"));
        assert_eq!(settings.stores_file, PathBuf::from("/etc/stores.json"));
        assert_eq!(settings.max_concurrency, 16);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_variables_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup(&[(SAVE_PATH_VAR, "  ")])).unwrap();
        assert_eq!(settings.save_path, PathBuf::from("jsons"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Settings::from_lookup(lookup(&[(MAX_CONCURRENCY_VAR, "many")])).unwrap_err();
        assert!(err.to_string().contains(MAX_CONCURRENCY_VAR));
        assert!(Settings::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, "-1")])).is_err());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let settings = Settings::from_lookup(lookup(&[(MAX_CONCURRENCY_VAR, "0")])).unwrap();
        assert_eq!(settings.max_concurrency, 1);
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let settings = Settings::from_lookup(lookup(&[(TIMEOUT_SECS_VAR, "0")])).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert_eq!(timeout_from_secs(0), Duration::from_secs(1));
        assert_eq!(timeout_from_secs(45), Duration::from_secs(45));
    }

    #[test]
    fn stores_are_grouped_by_city() {
        let directory = StoreDirectory::from_json(STORES).unwrap();
        let moscow = directory.city("Москва").unwrap();
        assert_eq!(moscow.len(), 2);
        assert_eq!(moscow[1].store_id, 11);
        assert_eq!(directory.city("Санкт-Петербург").unwrap().len(), 1);
        assert!(directory.city("Казань").is_none());
        assert_eq!(directory.cities().count(), 2);
    }

    #[test]
    fn stores_are_found_by_id() {
        let directory = StoreDirectory::from_json(STORES).unwrap();
        let (city, store) = directory.find(15).unwrap();
        assert_eq!(city, "Санкт-Петербург");
        assert_eq!(store.address, "Комендантский пр., 3");
        assert!(directory.find(999).is_none());
    }

    #[test]
    fn malformed_store_file_is_an_error() {
        assert!(StoreDirectory::from_json(r#"[{"city": "Москва"}]"#).is_err());
        assert!(StoreDirectory::from_json("{}").is_err());
    }
}
