//! Provider directory routes: listing, search/filter, and the
//! per-card live price check.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::directory::{ProviderFilter, ProviderRecord, SpeedFilter, StatusFilter, TypeFilter};
use crate::pricing::types::{Deal, DisplayOutcome};
use crate::scheduler::check_provider_price;

use super::SharedState;

/// Search and filter query parameters, matching the directory's buckets.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderQuery {
    pub search: Option<String>,
    pub speed: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

type BadRequest = (StatusCode, Json<Value>);

fn bad_request(message: String) -> BadRequest {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// Translate query strings into a typed filter.
/// Empty strings count as "no filter", mirroring a cleared search form.
pub fn parse_filter(query: &ProviderQuery) -> Result<ProviderFilter, BadRequest> {
    let mut filter = ProviderFilter {
        search: query.search.clone().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    if let Some(raw) = query.speed.as_deref().filter(|s| !s.is_empty()) {
        filter.speed = Some(
            SpeedFilter::parse(raw)
                .ok_or_else(|| bad_request(format!("Unsupported speed filter: {}", raw)))?,
        );
    }
    if let Some(raw) = query.kind.as_deref().filter(|s| !s.is_empty()) {
        filter.kind = Some(
            TypeFilter::parse(raw)
                .ok_or_else(|| bad_request(format!("Unsupported type filter: {}", raw)))?,
        );
    }
    if let Some(raw) = query.status.as_deref().filter(|s| !s.is_empty()) {
        filter.status = Some(
            StatusFilter::parse(raw)
                .ok_or_else(|| bad_request(format!("Unsupported status filter: {}", raw)))?,
        );
    }

    Ok(filter)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub name: String,
    pub website: Option<String>,
    pub provider_type: String,
    pub status: String,
    pub has_fibre: bool,
    pub has_gigabit: bool,
    pub is_rural: bool,
    pub is_business: bool,
    pub cheapest_known: Option<Deal>,
    pub live_deals: Option<Vec<Deal>>,
    pub live_source: Option<String>,
    pub live_fetched_at: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl From<&ProviderRecord> for ProviderSummary {
    fn from(record: &ProviderRecord) -> Self {
        Self {
            name: record.name.clone(),
            website: record.website.clone(),
            provider_type: record.provider_type.label().to_string(),
            status: record.status.label().to_string(),
            has_fibre: record.has_fibre,
            has_gigabit: record.has_gigabit,
            is_rural: record.is_rural,
            is_business: record.is_business,
            cheapest_known: record.cheapest_known().cloned(),
            live_deals: record.live_deals.clone(),
            live_source: record.live_source.clone(),
            live_fetched_at: record.live_fetched_at,
            last_checked: record.last_checked,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderListResponse {
    pub count: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub providers: Vec<ProviderSummary>,
}

pub async fn list_providers(
    State(state): State<SharedState>,
    Query(query): Query<ProviderQuery>,
) -> Result<Json<ProviderListResponse>, BadRequest> {
    let filter = parse_filter(&query)?;
    let directory = state.directory.read().await;
    let providers: Vec<ProviderSummary> = directory
        .all()
        .iter()
        .filter(|r| filter.matches(r))
        .map(ProviderSummary::from)
        .collect();

    Ok(Json(ProviderListResponse {
        count: providers.len(),
        last_updated: directory.last_updated(),
        providers,
    }))
}

pub async fn get_provider(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ProviderSummary>, (StatusCode, Json<Value>)> {
    let directory = state.directory.read().await;
    directory
        .get(&name)
        .map(|record| Json(ProviderSummary::from(record)))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("Unknown provider: {}", name) })),
            )
        })
}

/// Response of a live price check, one of the four outcome tags.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub provider: String,
    pub outcome: String,
    pub deal: Option<Deal>,
    pub source: Option<String>,
    pub message: Option<String>,
}

fn check_response(provider: String, outcome: &DisplayOutcome) -> CheckResponse {
    let (deal, source, message) = match outcome {
        DisplayOutcome::Live { deal, source } => {
            (Some(deal.clone()), Some(source.clone()), None)
        }
        DisplayOutcome::Known { deal } => (
            Some(deal.clone()),
            None,
            Some("Last known price".to_string()),
        ),
        DisplayOutcome::NoPrice { category } => {
            (None, None, Some(category.message().to_string()))
        }
        DisplayOutcome::Excluded => (None, None, Some("No website URL".to_string())),
    };

    CheckResponse {
        provider,
        outcome: outcome.tag().to_string(),
        deal,
        source,
        message,
    }
}

pub async fn check_provider(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<CheckResponse>, (StatusCode, Json<Value>)> {
    let record = {
        let directory = state.directory.read().await;
        directory.get(&name).cloned()
    };
    let Some(record) = record else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown provider: {}", name) })),
        ));
    };

    let ctx = state.refresh_context();
    let outcome = check_provider_price(&ctx, &record).await;

    if let Some(repository) = &state.repository {
        if let Err(err) = repository.record_outcome(&record.name, &outcome).await {
            tracing::warn!("Failed to record check outcome for {}: {}", record.name, err);
        }
    }

    Ok(Json(check_response(record.name, &outcome)))
}
