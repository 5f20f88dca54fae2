//! Price provider interface.
//!
//! Abstraction over the remote scraping service so the scheduler and
//! API handlers can be exercised against in-process fakes.

use async_trait::async_trait;

use crate::pricing::types::FetchResult;

/// A source of live price quotes for a single provider.
///
/// Implementations must return every failure mode as a
/// [`FetchResult::Failure`] value rather than an error; the batch
/// scheduler only aggregates typed outcomes.
#[async_trait]
pub trait PriceProvider {
    /// Fetch the current advertised deals for one provider.
    async fn fetch_price(&self, provider_name: &str, website_url: Option<&str>) -> FetchResult;

    /// Name of this source for logging.
    fn source_name(&self) -> &str;
}
