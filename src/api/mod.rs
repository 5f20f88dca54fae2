//! HTTP API layer.
//!
//! Thin JSON surface over the directory and the refresh engine. All
//! routes share [`ApiState`]; the refresh engine itself never touches
//! HTTP types, handlers translate between the two.

pub mod health;
pub mod providers;
pub mod refresh;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;

use crate::cache::PriceCache;
use crate::catalog::StaticCatalog;
use crate::directory::ProviderDirectory;
use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::pricing::provider::PriceProvider;
use crate::pricing::resolver::FallbackResolver;
use crate::repository::CheckRepository;
use crate::scheduler::{RefreshContext, RefreshSettings};

/// Shared state for all routes.
pub struct ApiState {
    pub directory: Arc<RwLock<ProviderDirectory>>,
    pub catalog: Arc<StaticCatalog>,
    pub cache: Arc<Mutex<PriceCache>>,
    pub price_provider: Arc<dyn PriceProvider + Send + Sync>,
    pub resolver: Arc<FallbackResolver>,
    pub repository: Option<Arc<CheckRepository>>,
    pub metrics: Arc<AppMetrics>,
    pub refresh: Arc<refresh::RefreshHandle>,
    pub settings: RefreshSettings,
}

pub type SharedState = Arc<ApiState>;

impl ApiState {
    /// Assemble the collaborators a refresh run or per-card check needs.
    pub fn refresh_context(&self) -> Arc<RefreshContext> {
        Arc::new(RefreshContext {
            provider: self.price_provider.clone(),
            cache: self.cache.clone(),
            resolver: self.resolver.clone(),
            directory: self.directory.clone(),
            metrics: Some(self.metrics.clone()),
            settings: self.settings.clone(),
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the complete application router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/providers", get(providers::list_providers))
        .route("/providers/:name", get(providers::get_provider))
        .route("/providers/:name/check", post(providers::check_provider))
        .route(
            "/refresh",
            post(refresh::start_refresh).get(refresh::refresh_status),
        )
        .route("/refresh/cancel", post(refresh::cancel_refresh))
        .route("/refresh/history", get(refresh::refresh_history))
        .route("/metrics", get(render_metrics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_http_metrics,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn render_metrics(State(state): State<SharedState>) -> Response {
    match state.metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body))
            .expect("metrics response should be valid"),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn track_http_metrics(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    state
        .metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), path.as_str(), response.status().as_str()])
        .inc();
    state
        .metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::catalog::{DataFile, ScrapedProvider};
    use crate::db::create_pool;
    use crate::pricing::types::FetchResult;

    /// Provider fake with canned per-name responses and a call counter.
    pub struct ScriptedProvider {
        responses: HashMap<String, FetchResult>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_response(mut self, name: &str, result: FetchResult) -> Self {
            self.responses.insert(name.to_string(), result);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceProvider for ScriptedProvider {
        async fn fetch_price(
            &self,
            provider_name: &str,
            _website_url: Option<&str>,
        ) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(provider_name)
                .cloned()
                .unwrap_or(FetchResult::EmptySuccess {
                    source: "direct".to_string(),
                })
        }

        fn source_name(&self) -> &str {
            "scripted"
        }
    }

    fn row(
        name: &str,
        website: Option<&str>,
        price: Option<&str>,
        status: &str,
    ) -> ScrapedProvider {
        ScrapedProvider {
            name: name.to_string(),
            website: website.map(str::to_string),
            price: price.map(str::to_string),
            speed: price.map(|_| "500Mbps".to_string()),
            deal_name: price.map(|_| "Standard".to_string()),
            status: Some(status.to_string()),
            last_checked: None,
        }
    }

    /// Three-provider directory: one priced, one bare, one ceased.
    pub fn sample_rows() -> Vec<ScrapedProvider> {
        vec![
            row(
                "Acme Fibre",
                Some("https://acme.example.com"),
                Some("27.50"),
                "active",
            ),
            row("Bare Co", Some("https://bare.example.com"), None, "active"),
            row("Ceased Co", None, None, "ceased"),
        ]
    }

    /// Full [`ApiState`] over a catalog built from `rows` only.
    pub async fn make_state(
        provider: Arc<dyn PriceProvider + Send + Sync>,
        rows: Vec<ScrapedProvider>,
    ) -> SharedState {
        let catalog = Arc::new(StaticCatalog::from_data_only(DataFile {
            last_updated: None,
            providers: rows,
        }));
        let directory = ProviderDirectory::from_catalog(&catalog);
        let repository = Arc::new(CheckRepository::new(
            create_pool("sqlite::memory:").await.unwrap(),
        ));

        Arc::new(ApiState {
            directory: Arc::new(RwLock::new(directory)),
            catalog: catalog.clone(),
            cache: Arc::new(Mutex::new(PriceCache::new(Duration::from_secs(1800)))),
            price_provider: provider,
            resolver: Arc::new(FallbackResolver::new(catalog)),
            repository: Some(repository),
            metrics: Arc::new(AppMetrics::new().unwrap()),
            refresh: Arc::new(refresh::RefreshHandle::new()),
            settings: RefreshSettings {
                batch_size: 10,
                batch_delay: Duration::from_millis(1),
                fetch_timeout: Duration::from_secs(5),
            },
        })
    }
}
