//! In-memory provider directory.
//!
//! Holds one [`ProviderRecord`] per catalog entry, enriched with
//! name-derived classification flags, and answers the search/filter
//! queries the API exposes. Live deals are only ever written here from
//! a successful fetch; catalog data never masquerades as live data.
//!
//! Callers wrap the directory in `Arc<RwLock<ProviderDirectory>>` so it
//! can be shared between the refresh task and the API handlers.

use chrono::{DateTime, Utc};

use crate::catalog::{ProviderStatus, StaticCatalog};
use crate::pricing::types::{cheapest_deal, Deal};

/// Broad market segment of a provider, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Residential,
    Business,
    Rural,
}

impl ProviderType {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderType::Residential => "residential",
            ProviderType::Business => "business",
            ProviderType::Rural => "rural",
        }
    }
}

/// Identity and last-known commercial data for one ISP.
#[derive(Debug, Clone)]
pub struct ProviderRecord {
    pub name: String,
    pub website: Option<String>,
    pub provider_type: ProviderType,
    pub status: ProviderStatus,
    pub last_checked: Option<DateTime<Utc>>,
    pub known_deals: Vec<Deal>,
    pub live_deals: Option<Vec<Deal>>,
    pub live_fetched_at: Option<DateTime<Utc>>,
    pub live_source: Option<String>,
    pub has_fibre: bool,
    pub has_gigabit: bool,
    pub is_rural: bool,
    pub is_business: bool,
}

impl ProviderRecord {
    pub fn has_website(&self) -> bool {
        self.website
            .as_deref()
            .map(|w| !w.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn cheapest_known(&self) -> Option<&Deal> {
        cheapest_deal(&self.known_deals)
    }

    pub fn has_price(&self) -> bool {
        self.cheapest_known().is_some()
            || self
                .live_deals
                .as_deref()
                .map(|d| !d.is_empty())
                .unwrap_or(false)
    }

    /// Headline download speed in Mbps, taken from the cheapest known
    /// deal's speed string (leading digits only, like `parseInt`).
    pub fn headline_speed_mbps(&self) -> Option<u32> {
        self.cheapest_known()
            .and_then(|deal| leading_mbps(&deal.speed))
    }
}

/// Parse the leading digits of a speed string ("500Mbps" -> 500).
fn leading_mbps(speed: &str) -> Option<u32> {
    let digits: String = speed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

// ---- name classification heuristics -----------------------------------------

fn determine_provider_type(name: &str) -> ProviderType {
    let lower = name.to_lowercase();
    if ["business", "b2b", "enterprise"]
        .iter()
        .any(|k| lower.contains(k))
    {
        return ProviderType::Business;
    }
    if ["rural", "countryside", "community", "b4rn", "b4sh", "b4rk"]
        .iter()
        .any(|k| lower.contains(k))
    {
        return ProviderType::Rural;
    }
    ProviderType::Residential
}

fn has_fibre_in_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["fibre", "fiber", "fttp"].iter().any(|k| lower.contains(k))
}

fn has_gigabit_capability(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower.contains("gigabeam") {
        return false;
    }
    const GIGABIT_KEYWORDS: &[&str] = &[
        "gigabit",
        "giga",
        "1gbps",
        "1000mbps",
        "hyperoptic",
        "gigaclear",
        "community fibre",
        "g.network",
        "brsk",
        "youfibre",
        "giganet",
        "lit fibre",
        "trooli",
        "toob",
        "lightning",
        "fibrus",
        "zzoomm",
        "yayzi",
        "truespeed",
        "brawband",
        "connexin",
        "virgin media",
        "bt",
        "ee",
        "sky",
        "vodafone",
        "zen",
        "kcom",
    ];
    GIGABIT_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_rural_provider(name: &str) -> bool {
    const RURAL_KEYWORDS: &[&str] = &[
        "rural",
        "countryside",
        "community",
        "village",
        "b4rn",
        "b4sh",
        "b4rk",
        "county",
        "wessex",
        "wildanet",
        "voneus",
        "quickline",
        "airband",
    ];
    let lower = name.to_lowercase();
    RURAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_business_provider(name: &str) -> bool {
    const BUSINESS_KEYWORDS: &[&str] = &["business", "b2b", "enterprise", "commercial", "corporate"];
    let lower = name.to_lowercase();
    BUSINESS_KEYWORDS.iter().any(|k| lower.contains(k))
}

// ---- filtering ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedFilter {
    Fibre,
    UltraFast,
    Gigabit,
}

impl SpeedFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fibre" => Some(SpeedFilter::Fibre),
            "ultra-fast" => Some(SpeedFilter::UltraFast),
            "gigabit" => Some(SpeedFilter::Gigabit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    Residential,
    Business,
    Rural,
}

impl TypeFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "residential" => Some(TypeFilter::Residential),
            "business" => Some(TypeFilter::Business),
            "rural" => Some(TypeFilter::Rural),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    Offline,
    Ceased,
    WithPrice,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(StatusFilter::Active),
            "offline" => Some(StatusFilter::Offline),
            "ceased" => Some(StatusFilter::Ceased),
            "with-price" => Some(StatusFilter::WithPrice),
            _ => None,
        }
    }
}

/// Combined search and filter criteria. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct ProviderFilter {
    pub search: Option<String>,
    pub speed: Option<SpeedFilter>,
    pub kind: Option<TypeFilter>,
    pub status: Option<StatusFilter>,
}

impl ProviderFilter {
    pub fn matches(&self, record: &ProviderRecord) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            if !term.is_empty() && !record.name.to_lowercase().contains(&term) {
                return false;
            }
        }

        if let Some(speed) = self.speed {
            let mbps = record.headline_speed_mbps().unwrap_or(0);
            let matches_speed = match speed {
                SpeedFilter::Fibre => record.has_fibre || record.has_gigabit,
                SpeedFilter::UltraFast => record.has_fibre || record.has_gigabit || mbps >= 100,
                SpeedFilter::Gigabit => record.has_gigabit || mbps >= 900,
            };
            if !matches_speed {
                return false;
            }
        }

        if let Some(kind) = self.kind {
            let matches_kind = match kind {
                TypeFilter::Residential => record.provider_type == ProviderType::Residential,
                TypeFilter::Business => {
                    record.provider_type == ProviderType::Business || record.is_business
                }
                TypeFilter::Rural => record.provider_type == ProviderType::Rural || record.is_rural,
            };
            if !matches_kind {
                return false;
            }
        }

        if let Some(status) = self.status {
            let matches_status = match status {
                StatusFilter::Active => record.status.is_active_like(),
                StatusFilter::Offline => record.status.is_offline_like(),
                StatusFilter::Ceased => record.status.is_ceased(),
                StatusFilter::WithPrice => record.has_price(),
            };
            if !matches_status {
                return false;
            }
        }

        true
    }
}

// ---- directory ---------------------------------------------------------------

#[derive(Debug)]
pub struct ProviderDirectory {
    records: Vec<ProviderRecord>,
    last_updated: Option<DateTime<Utc>>,
}

impl ProviderDirectory {
    /// Build one record per catalog entry, classifying by name.
    pub fn from_catalog(catalog: &StaticCatalog) -> Self {
        let records = catalog
            .providers()
            .iter()
            .map(|entry| {
                let name = entry.name.clone();
                let known_deals = entry.known_deals.clone();
                let has_known_speed = known_deals.iter().any(|d| !d.speed.trim().is_empty());
                ProviderRecord {
                    has_fibre: has_fibre_in_name(&name) || has_known_speed,
                    has_gigabit: has_gigabit_capability(&name)
                        || known_deals
                            .iter()
                            .any(|d| leading_mbps(&d.speed).unwrap_or(0) >= 900),
                    is_rural: is_rural_provider(&name),
                    is_business: is_business_provider(&name),
                    provider_type: determine_provider_type(&name),
                    website: entry.website.clone(),
                    status: entry.status.clone(),
                    last_checked: entry.last_checked,
                    known_deals,
                    live_deals: None,
                    live_fetched_at: None,
                    live_source: None,
                    name,
                }
            })
            .collect();

        Self {
            records,
            last_updated: catalog.last_updated(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all(&self) -> &[ProviderRecord] {
        &self.records
    }

    /// Case-insensitive lookup by display name.
    pub fn get(&self, name: &str) -> Option<&ProviderRecord> {
        self.records
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Cloned snapshot of all records matching `filter`.
    pub fn filtered(&self, filter: &ProviderFilter) -> Vec<ProviderRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Record a successful live fetch for one provider.
    /// Returns `false` when the provider is not in the directory.
    pub fn record_live_result(&mut self, name: &str, deals: Vec<Deal>, source: String) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(name))
        {
            Some(record) => {
                record.live_deals = Some(deals);
                record.live_source = Some(source);
                record.live_fetched_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Number of providers currently holding live deals.
    pub fn live_price_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.live_deals.as_deref().map(|d| !d.is_empty()).unwrap_or(false))
            .count()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataFile, ScrapedProvider, StaticCatalog};

    fn row(name: &str, website: Option<&str>, status: &str) -> ScrapedProvider {
        ScrapedProvider {
            name: name.to_string(),
            website: website.map(str::to_string),
            price: None,
            speed: None,
            deal_name: None,
            status: Some(status.to_string()),
            last_checked: None,
        }
    }

    fn priced_row(name: &str, price: &str, speed: &str) -> ScrapedProvider {
        ScrapedProvider {
            name: name.to_string(),
            website: Some(format!("https://{}.example.com", name.to_lowercase())),
            price: Some(price.to_string()),
            speed: Some(speed.to_string()),
            deal_name: Some("Standard".to_string()),
            status: Some("active".to_string()),
            last_checked: None,
        }
    }

    fn directory_from(rows: Vec<ScrapedProvider>) -> ProviderDirectory {
        let catalog = StaticCatalog::from_data_only(DataFile {
            last_updated: None,
            providers: rows,
        });
        ProviderDirectory::from_catalog(&catalog)
    }

    // ---- classification ----

    #[test]
    fn business_names_classify_as_business() {
        assert_eq!(
            determine_provider_type("Acme Business Internet"),
            ProviderType::Business
        );
        assert_eq!(
            determine_provider_type("Enterprise Fibre Ltd"),
            ProviderType::Business
        );
    }

    #[test]
    fn rural_names_classify_as_rural() {
        assert_eq!(
            determine_provider_type("Broadband for the Rural North Limited (B4RN)"),
            ProviderType::Rural
        );
        assert_eq!(
            determine_provider_type("Community Fibre Ltd"),
            ProviderType::Rural
        );
    }

    #[test]
    fn everything_else_classifies_as_residential() {
        assert_eq!(determine_provider_type("Sky"), ProviderType::Residential);
    }

    #[test]
    fn gigabeam_is_excluded_from_gigabit_keywords() {
        assert!(!has_gigabit_capability("GigaBeam Networks"));
        assert!(has_gigabit_capability("Gigaclear Limited"));
        assert!(has_gigabit_capability("Hyperoptic Limited"));
    }

    #[test]
    fn leading_mbps_parses_like_parse_int() {
        assert_eq!(leading_mbps("500Mbps"), Some(500));
        assert_eq!(leading_mbps("1130Mbps"), Some(1130));
        assert_eq!(leading_mbps("Up to 80Mbps"), None);
        assert_eq!(leading_mbps(""), None);
    }

    // ---- lookups ----

    #[test]
    fn get_is_case_insensitive() {
        let directory = directory_from(vec![row("Acme Fibre", Some("https://a.example"), "active")]);
        assert!(directory.get("acme fibre").is_some());
        assert!(directory.get("ACME FIBRE").is_some());
        assert!(directory.get("nobody").is_none());
    }

    // ---- filters ----

    #[test]
    fn search_filter_matches_substring_case_insensitively() {
        let directory = directory_from(vec![
            row("Acme Fibre", None, "active"),
            row("Other ISP", None, "active"),
        ]);

        let filter = ProviderFilter {
            search: Some("acme".to_string()),
            ..Default::default()
        };
        let hits = directory.filtered(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Acme Fibre");
    }

    #[test]
    fn empty_filter_matches_everything() {
        let directory = directory_from(vec![
            row("One", None, "active"),
            row("Two", None, "ceased"),
        ]);
        assert_eq!(directory.filtered(&ProviderFilter::default()).len(), directory.len());
    }

    #[test]
    fn status_filter_groups_match_original_buckets() {
        let directory = directory_from(vec![
            row("Alive Ltd", None, "active"),
            row("Blocked Ltd", None, "active_blocked"),
            row("Probably Ltd", None, "likely_active"),
            row("Dark Ltd", None, "timeout"),
            row("Broken Ltd", None, "error_dns"),
            row("Gone Ltd", None, "ceased"),
        ]);

        let active = ProviderFilter {
            status: Some(StatusFilter::Active),
            ..Default::default()
        };
        assert_eq!(directory.filtered(&active).len(), 3);

        let offline = ProviderFilter {
            status: Some(StatusFilter::Offline),
            ..Default::default()
        };
        assert_eq!(directory.filtered(&offline).len(), 2);

        let ceased = ProviderFilter {
            status: Some(StatusFilter::Ceased),
            ..Default::default()
        };
        assert_eq!(directory.filtered(&ceased).len(), 1);
    }

    #[test]
    fn with_price_filter_requires_a_known_or_live_deal() {
        let directory = directory_from(vec![
            priced_row("Priced Ltd", "24.99", "100Mbps"),
            row("Unpriced Ltd", Some("https://u.example"), "active"),
        ]);

        let filter = ProviderFilter {
            status: Some(StatusFilter::WithPrice),
            ..Default::default()
        };
        let hits = directory.filtered(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Priced Ltd");
    }

    #[test]
    fn gigabit_speed_filter_uses_keyword_or_headline_speed() {
        let directory = directory_from(vec![
            priced_row("Plain 900 Ltd", "30.00", "950Mbps"),
            priced_row("Slowline Ltd", "20.00", "67Mbps"),
        ]);

        let filter = ProviderFilter {
            speed: Some(SpeedFilter::Gigabit),
            ..Default::default()
        };
        let hits = directory.filtered(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Plain 900 Ltd");
    }

    #[test]
    fn type_filter_matches_classification_or_keyword_flags() {
        let directory = directory_from(vec![
            row("Wessex Internet Limited", None, "active"),
            row("Sky", None, "active"),
        ]);

        let rural = ProviderFilter {
            kind: Some(TypeFilter::Rural),
            ..Default::default()
        };
        let hits = directory.filtered(&rural);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Wessex Internet Limited");
    }

    // ---- live results ----

    #[test]
    fn record_live_result_sets_live_fields() {
        let mut directory = directory_from(vec![priced_row("Acme Fibre", "24.99", "500Mbps")]);
        let deals = vec![Deal {
            name: "Go".to_string(),
            speed: "500Mbps".to_string(),
            price: "21.99".to_string(),
        }];

        assert!(directory.record_live_result("acme fibre", deals, "uswitch".to_string()));

        let record = directory.get("Acme Fibre").unwrap();
        assert_eq!(record.live_deals.as_ref().unwrap().len(), 1);
        assert_eq!(record.live_source.as_deref(), Some("uswitch"));
        assert!(record.live_fetched_at.is_some());
        assert_eq!(directory.live_price_count(), 1);
    }

    #[test]
    fn record_live_result_for_unknown_provider_is_a_noop() {
        let mut directory = directory_from(vec![]);
        assert!(!directory.record_live_result("ghost", vec![], "direct".to_string()));
    }
}
