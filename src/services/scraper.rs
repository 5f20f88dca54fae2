//! Client for the remote price-scraping endpoint.
//!
//! One `GET {endpoint}?provider=...&url=...` request per provider. The
//! endpoint answers with `{ success, deals, source, error }`. Timeouts,
//! transport errors, non-2xx statuses, and undecodable bodies all come
//! back as [`FetchResult::Failure`] values; nothing is propagated as an
//! error past this boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;

use crate::error::AppError;
use crate::pricing::error::FetchErrorKind;
use crate::pricing::provider::PriceProvider;
use crate::pricing::types::{Deal, FetchResult};

/// Wire shape of a scraper response.
#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    deals: Vec<Deal>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ScraperClient {
    endpoint: String,
    http: Client,
}

impl ScraperClient {
    /// Build a client with a hard per-request timeout. The timeout
    /// covers connect, send, and body read; elapsing it aborts the
    /// in-flight request.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {}", err)))?;

        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PriceProvider for ScraperClient {
    async fn fetch_price(&self, provider_name: &str, website_url: Option<&str>) -> FetchResult {
        let mut request = self
            .http
            .get(&self.endpoint)
            .query(&[("provider", provider_name)])
            .header(header::ACCEPT, "application/json");
        if let Some(url) = website_url {
            request = request.query(&[("url", url)]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return FetchResult::Failure {
                    kind: FetchErrorKind::Timeout,
                }
            }
            Err(err) => {
                return FetchResult::Failure {
                    kind: FetchErrorKind::Connection(err.to_string()),
                }
            }
        };

        if !response.status().is_success() {
            return FetchResult::Failure {
                kind: FetchErrorKind::Connection(format!(
                    "scraper returned HTTP {}",
                    response.status()
                )),
            };
        }

        let body = match response.json::<ScrapeResponse>().await {
            Ok(body) => body,
            Err(err) if err.is_timeout() => {
                return FetchResult::Failure {
                    kind: FetchErrorKind::Timeout,
                }
            }
            Err(err) => {
                return FetchResult::Failure {
                    kind: FetchErrorKind::InvalidBody(err.to_string()),
                }
            }
        };

        if !body.success {
            if let Some(error) = &body.error {
                tracing::debug!("Scraper reported no data for {}: {}", provider_name, error);
            }
        }

        let source = body.source.unwrap_or_else(|| "direct".to_string());
        if body.deals.is_empty() {
            FetchResult::EmptySuccess { source }
        } else {
            FetchResult::Success {
                deals: body.deals,
                source,
            }
        }
    }

    fn source_name(&self) -> &str {
        "scraper"
    }
}
