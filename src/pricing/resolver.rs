//! Fallback resolution for fetch results.
//!
//! Turns a raw [`FetchResult`] into the [`DisplayOutcome`] a user sees,
//! walking the data tiers in order: live deals, then the static
//! catalog's last-known-good deals, then a classified no-price outcome.
//! A transient scrape failure therefore never drops a provider below
//! the catalog's last-known-good price.

use std::sync::Arc;

use crate::catalog::StaticCatalog;
use crate::pricing::error::{FailureCategory, FetchErrorKind};
use crate::pricing::types::{cheapest_deal, DisplayOutcome, FetchResult};

pub struct FallbackResolver {
    catalog: Arc<StaticCatalog>,
}

impl FallbackResolver {
    pub fn new(catalog: Arc<StaticCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve one provider's fetch result into its final outcome.
    pub fn resolve(&self, provider_name: &str, fetch: &FetchResult) -> DisplayOutcome {
        if let FetchResult::Success { deals, source } = fetch {
            if let Some(deal) = cheapest_deal(deals) {
                return DisplayOutcome::Live {
                    deal: deal.clone(),
                    source: source.clone(),
                };
            }
        }

        let known = self.catalog.known_deals(provider_name);
        if let Some(deal) = cheapest_deal(known) {
            tracing::debug!("Using catalog deals for {}", provider_name);
            return DisplayOutcome::Known { deal: deal.clone() };
        }

        DisplayOutcome::NoPrice {
            category: classify(fetch),
        }
    }
}

fn classify(fetch: &FetchResult) -> FailureCategory {
    match fetch {
        FetchResult::Failure {
            kind: FetchErrorKind::Timeout,
        } => FailureCategory::Timeout,
        FetchResult::Failure { .. } => FailureCategory::ConnectionOrSsl,
        _ => FailureCategory::NoDataFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataFile, ScrapedProvider};
    use crate::pricing::types::Deal;

    fn deal(name: &str, price: &str) -> Deal {
        Deal {
            name: name.to_string(),
            speed: "500Mbps".to_string(),
            price: price.to_string(),
        }
    }

    /// Catalog where "Known Co" has curated deals and "Bare Co" has none.
    fn test_resolver() -> FallbackResolver {
        let rows = vec![
            ScrapedProvider {
                name: "Known Co".to_string(),
                website: Some("https://known.example.com".to_string()),
                price: Some("31.00".to_string()),
                speed: Some("200Mbps".to_string()),
                deal_name: Some("Steady".to_string()),
                status: Some("active".to_string()),
                last_checked: None,
            },
            ScrapedProvider {
                name: "Bare Co".to_string(),
                website: Some("https://bare.example.com".to_string()),
                price: None,
                speed: None,
                deal_name: None,
                status: Some("active".to_string()),
                last_checked: None,
            },
        ];
        let catalog = StaticCatalog::from_parts(Some(DataFile {
            last_updated: None,
            providers: rows,
        }));
        FallbackResolver::new(Arc::new(catalog))
    }

    #[test]
    fn success_with_deals_resolves_to_cheapest_live_deal() {
        let resolver = test_resolver();
        let fetch = FetchResult::Success {
            deals: vec![deal("a", "29.99"), deal("b", "19.99"), deal("c", "39.99")],
            source: "uswitch".to_string(),
        };

        let outcome = resolver.resolve("Known Co", &fetch);
        assert_eq!(outcome.tag(), "live");
        assert_eq!(outcome.deal().unwrap().price, "19.99");
    }

    #[test]
    fn empty_success_falls_back_to_catalog_deal() {
        let resolver = test_resolver();
        let fetch = FetchResult::EmptySuccess {
            source: "direct".to_string(),
        };

        let outcome = resolver.resolve("Known Co", &fetch);
        assert_eq!(outcome.tag(), "cached");
        assert_eq!(outcome.deal().unwrap().price, "31.00");
    }

    #[test]
    fn failure_with_known_deals_falls_back_rather_than_erroring() {
        let resolver = test_resolver();
        let fetch = FetchResult::Failure {
            kind: FetchErrorKind::Connection("HTTP 502".to_string()),
        };

        let outcome = resolver.resolve("Known Co", &fetch);
        assert_eq!(outcome.tag(), "cached");
    }

    #[test]
    fn failure_without_known_deals_is_classified_not_silently_live() {
        let resolver = test_resolver();

        let timeout = resolver.resolve(
            "Bare Co",
            &FetchResult::Failure {
                kind: FetchErrorKind::Timeout,
            },
        );
        assert_eq!(
            timeout,
            DisplayOutcome::NoPrice {
                category: FailureCategory::Timeout
            }
        );

        let connection = resolver.resolve(
            "Bare Co",
            &FetchResult::Failure {
                kind: FetchErrorKind::InvalidBody("truncated".to_string()),
            },
        );
        assert_eq!(
            connection,
            DisplayOutcome::NoPrice {
                category: FailureCategory::ConnectionOrSsl
            }
        );

        let empty = resolver.resolve(
            "Bare Co",
            &FetchResult::EmptySuccess {
                source: "direct".to_string(),
            },
        );
        assert_eq!(
            empty,
            DisplayOutcome::NoPrice {
                category: FailureCategory::NoDataFound
            }
        );
    }

    #[test]
    fn success_with_only_unparseable_prices_still_falls_back() {
        let resolver = test_resolver();
        let fetch = FetchResult::Success {
            deals: vec![deal("weird", "call for price")],
            source: "direct".to_string(),
        };

        let outcome = resolver.resolve("Known Co", &fetch);
        assert_eq!(outcome.tag(), "cached");
    }

    #[test]
    fn unknown_provider_with_failure_ends_no_price() {
        let resolver = test_resolver();
        let outcome = resolver.resolve(
            "Never Heard Of It",
            &FetchResult::Failure {
                kind: FetchErrorKind::Timeout,
            },
        );
        assert_eq!(outcome.tag(), "no-price");
    }
}
