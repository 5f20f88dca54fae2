//! Core data types for provider price checks.

use serde::{Deserialize, Serialize};

use crate::pricing::error::{FailureCategory, FetchErrorKind};

/// A single broadband deal as advertised by a provider.
///
/// `price` is kept as the decimal string the source published
/// (e.g. `"24.99"`); use [`Deal::parsed_price`] for comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub name: String,
    pub speed: String,
    pub price: String,
}

impl Deal {
    /// Parse the advertised monthly price. Returns `None` for anything
    /// that is not a finite, non-negative number.
    pub fn parsed_price(&self) -> Option<f64> {
        let value = self.price.trim().parse::<f64>().ok()?;
        if value.is_finite() && value >= 0.0 {
            Some(value)
        } else {
            None
        }
    }
}

/// Select the deal with the lowest parsed price.
///
/// Ties are broken by first occurrence; deals whose price does not
/// parse are never selected.
pub fn cheapest_deal(deals: &[Deal]) -> Option<&Deal> {
    let mut best: Option<(&Deal, f64)> = None;
    for deal in deals {
        let Some(price) = deal.parsed_price() else {
            continue;
        };
        match best {
            Some((_, best_price)) if price >= best_price => {}
            _ => best = Some((deal, price)),
        }
    }
    best.map(|(deal, _)| deal)
}

/// Normalised result of one scrape request.
///
/// Only `Success` and `EmptySuccess` are cacheable; a `Failure` is
/// returned to the caller but never persisted, so the next refresh
/// retries the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Well-formed response with at least one deal.
    Success { deals: Vec<Deal>, source: String },
    /// Well-formed response with no deals.
    EmptySuccess { source: String },
    /// Timeout, transport failure, non-2xx status, or undecodable body.
    Failure { kind: FetchErrorKind },
}

impl FetchResult {
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, FetchResult::Failure { .. })
    }
}

/// Final classified result shown for one provider after fallback
/// resolution. Every provider ends in exactly one of these four tags.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayOutcome {
    /// Fresh deal from the live scrape.
    Live { deal: Deal, source: String },
    /// Last-known-good deal from the static catalog.
    Known { deal: Deal },
    /// No usable data from any tier.
    NoPrice { category: FailureCategory },
    /// Provider had no website URL and was skipped before any fetch.
    Excluded,
}

impl DisplayOutcome {
    pub fn tag(&self) -> &'static str {
        match self {
            DisplayOutcome::Live { .. } => "live",
            DisplayOutcome::Known { .. } => "cached",
            DisplayOutcome::NoPrice { .. } => "no-price",
            DisplayOutcome::Excluded => "excluded",
        }
    }

    /// Whether this outcome counts towards the run's `succeeded` tally.
    /// Catalog fallback still counts; the user received usable data.
    pub fn counts_as_success(&self) -> bool {
        matches!(
            self,
            DisplayOutcome::Live { .. } | DisplayOutcome::Known { .. }
        )
    }

    /// The deal delivered to the user, when there is one.
    pub fn deal(&self) -> Option<&Deal> {
        match self {
            DisplayOutcome::Live { deal, .. } | DisplayOutcome::Known { deal } => Some(deal),
            _ => None,
        }
    }
}

/// Progress of one refresh-all run, updated after every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            succeeded: 0,
            failed: 0,
        }
    }
}

/// Final tally of one refresh-all run, emitted exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}
