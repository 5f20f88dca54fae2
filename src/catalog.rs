//! Static provider catalog.
//!
//! The catalog is the bottom tier of the price fallback chain: an
//! immutable, name-keyed table of last-known-good deals and website
//! URLs. It is assembled once at startup by merging two inputs:
//!
//! 1. the embedded known-provider table (curated JSON compiled in via
//!    `include_str!`), and
//! 2. the scraped provider data file (`data/broadband_data.json`).
//!
//! For providers present in both, the embedded table wins on website,
//! status, and deals. Embedded providers missing from the data file are
//! appended. If the data file cannot be read or parsed, the catalog
//! falls back to the embedded table alone.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::pricing::types::Deal;

const BUILTIN_CATALOG: &str = include_str!("../data/known_providers.json");

/// Shape of the scraped provider data file.
#[derive(Debug, Clone, Deserialize)]
pub struct DataFile {
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub providers: Vec<ScrapedProvider>,
}

/// One scraped row from the data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedProvider {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub deal_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

/// One entry of the embedded known-provider table.
#[derive(Debug, Clone, Deserialize)]
struct KnownProvider {
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    deals: Vec<Deal>,
    #[serde(default)]
    status: Option<String>,
}

/// Operational status of a provider, parsed from catalog strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Active,
    ActiveBlocked,
    LikelyActive,
    Offline,
    Parked,
    Timeout,
    SslError,
    Ceased,
    Error(String),
    Other(String),
    Unknown,
}

impl ProviderStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ProviderStatus::Unknown;
        };
        let normalised = raw.trim().to_lowercase();
        match normalised.as_str() {
            "" => ProviderStatus::Unknown,
            "active" => ProviderStatus::Active,
            "active_blocked" => ProviderStatus::ActiveBlocked,
            "likely_active" => ProviderStatus::LikelyActive,
            "offline" => ProviderStatus::Offline,
            "parked" => ProviderStatus::Parked,
            "timeout" => ProviderStatus::Timeout,
            "ssl_error" => ProviderStatus::SslError,
            "ceased" => ProviderStatus::Ceased,
            other if other.starts_with("error_") => ProviderStatus::Error(other.to_string()),
            other => ProviderStatus::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ProviderStatus::Active => "active",
            ProviderStatus::ActiveBlocked => "active_blocked",
            ProviderStatus::LikelyActive => "likely_active",
            ProviderStatus::Offline => "offline",
            ProviderStatus::Parked => "parked",
            ProviderStatus::Timeout => "timeout",
            ProviderStatus::SslError => "ssl_error",
            ProviderStatus::Ceased => "ceased",
            ProviderStatus::Error(raw) | ProviderStatus::Other(raw) => raw,
            ProviderStatus::Unknown => "unknown",
        }
    }

    /// Still trading and reachable, as far as the catalog knows.
    pub fn is_active_like(&self) -> bool {
        matches!(
            self,
            ProviderStatus::Active | ProviderStatus::ActiveBlocked | ProviderStatus::LikelyActive
        )
    }

    /// Unreachable at last check, but not known to have ceased trading.
    pub fn is_offline_like(&self) -> bool {
        matches!(
            self,
            ProviderStatus::Offline
                | ProviderStatus::Parked
                | ProviderStatus::Timeout
                | ProviderStatus::SslError
                | ProviderStatus::Error(_)
        )
    }

    pub fn is_ceased(&self) -> bool {
        matches!(self, ProviderStatus::Ceased)
    }
}

/// One merged catalog entry.
#[derive(Debug, Clone)]
pub struct CatalogProvider {
    pub name: String,
    pub website: Option<String>,
    pub status: ProviderStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub known_deals: Vec<Deal>,
}

/// Immutable merged catalog, keyed case-insensitively by name.
#[derive(Debug)]
pub struct StaticCatalog {
    providers: Vec<CatalogProvider>,
    by_key: HashMap<String, usize>,
    last_updated: Option<DateTime<Utc>>,
}

impl StaticCatalog {
    /// Load the data file and merge it with the embedded table.
    /// A missing or malformed file degrades to the embedded table.
    pub fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<DataFile>(&raw) {
                Ok(data) => Some(data),
                Err(err) => {
                    tracing::warn!(
                        "Failed to parse provider data file {}: {}",
                        path.display(),
                        err
                    );
                    None
                }
            },
            Err(err) => {
                tracing::warn!(
                    "Failed to read provider data file {}: {}",
                    path.display(),
                    err
                );
                None
            }
        };
        Self::from_parts(data)
    }

    /// Merge scraped rows with the embedded known-provider table.
    pub fn from_parts(data: Option<DataFile>) -> Self {
        Self::merge(data, builtin_catalog())
    }

    /// Build a catalog from explicit rows only, without the embedded table.
    #[cfg(test)]
    pub(crate) fn from_data_only(data: DataFile) -> Self {
        Self::merge(Some(data), HashMap::new())
    }

    fn merge(data: Option<DataFile>, known: HashMap<String, KnownProvider>) -> Self {
        let last_updated = data.as_ref().and_then(|d| d.last_updated);
        let mut providers: Vec<CatalogProvider> = Vec::new();

        if let Some(data) = data {
            for scraped in data.providers {
                let name = scraped.name.replace("&amp;", "&");
                let entry = known.get(&name);

                let mut website = scraped.website.filter(|w| !w.trim().is_empty());
                let mut status = scraped.status;
                let mut deals = Vec::new();

                if let Some(entry) = entry {
                    if entry.website.is_some() {
                        website = entry.website.clone();
                    }
                    if entry.status.is_some() {
                        status = entry.status.clone();
                    }
                    deals = entry.deals.clone();
                }

                // A scraped row with a price but no curated deals still
                // contributes one last-known-good deal to the catalog.
                if deals.is_empty() {
                    if let Some(price) = scraped.price {
                        deals.push(Deal {
                            name: scraped
                                .deal_name
                                .unwrap_or_else(|| "Standard Deal".to_string()),
                            speed: scraped.speed.unwrap_or_default(),
                            price,
                        });
                    }
                }

                providers.push(CatalogProvider {
                    name,
                    website,
                    status: ProviderStatus::parse(status.as_deref()),
                    last_checked: scraped.last_checked,
                    known_deals: deals,
                });
            }
        }

        for (name, entry) in &known {
            if !providers.iter().any(|p| &p.name == name) {
                providers.push(CatalogProvider {
                    name: name.clone(),
                    website: entry.website.clone(),
                    status: ProviderStatus::parse(entry.status.as_deref()),
                    last_checked: None,
                    known_deals: entry.deals.clone(),
                });
            }
        }

        providers.sort_by(|a, b| a.name.cmp(&b.name));
        let by_key = providers
            .iter()
            .enumerate()
            .map(|(index, p)| (p.name.to_lowercase(), index))
            .collect();

        Self {
            providers,
            by_key,
            last_updated,
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn get(&self, name: &str) -> Option<&CatalogProvider> {
        self.by_key
            .get(&name.to_lowercase())
            .map(|&index| &self.providers[index])
    }

    /// Last-known-good deals for a provider; empty when none are known.
    pub fn known_deals(&self, name: &str) -> &[Deal] {
        self.get(name)
            .map(|p| p.known_deals.as_slice())
            .unwrap_or(&[])
    }

    pub fn providers(&self) -> &[CatalogProvider] {
        &self.providers
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn builtin_catalog() -> HashMap<String, KnownProvider> {
    serde_json::from_str(BUILTIN_CATALOG).expect("embedded provider catalog should be valid JSON")
}
