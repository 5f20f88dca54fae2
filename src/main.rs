use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::signal;
use tokio::sync::{Mutex, RwLock};

use broadband_price_tracker::api::{self, refresh::RefreshHandle, ApiState};
use broadband_price_tracker::cache::PriceCache;
use broadband_price_tracker::catalog::StaticCatalog;
use broadband_price_tracker::cli::Cli;
use broadband_price_tracker::config::Config;
use broadband_price_tracker::db;
use broadband_price_tracker::directory::ProviderDirectory;
use broadband_price_tracker::error::AppError;
use broadband_price_tracker::logging::init_logging;
use broadband_price_tracker::metrics::AppMetrics;
use broadband_price_tracker::pricing::provider::PriceProvider;
use broadband_price_tracker::pricing::resolver::FallbackResolver;
use broadband_price_tracker::repository::CheckRepository;
use broadband_price_tracker::services::scraper::ScraperClient;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env()
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });
    config.apply_cli(&cli);
    tracing::info!("Service starting with config: {:?}", config);

    let catalog = Arc::new(StaticCatalog::load(&config.data_file));
    let directory = ProviderDirectory::from_catalog(&catalog);
    tracing::info!("Loaded {} providers", directory.len());

    let scraper = ScraperClient::new(config.scraper_endpoint.clone(), config.fetch_timeout)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });
    let price_provider: Arc<dyn PriceProvider + Send + Sync> = Arc::new(scraper);

    let repository = match db::create_pool(&config.database_url).await {
        Ok(pool) => Some(Arc::new(CheckRepository::new(pool))),
        Err(err) => {
            tracing::warn!("Check history disabled, database unavailable: {}", err);
            None
        }
    };

    let metrics = Arc::new(AppMetrics::new().unwrap_or_else(|err| {
        tracing::error!("Failed to build metrics registry: {}", err);
        std::process::exit(1);
    }));
    metrics.providers_tracked.set(directory.len() as f64);

    let state = Arc::new(ApiState {
        directory: Arc::new(RwLock::new(directory)),
        catalog: catalog.clone(),
        cache: Arc::new(Mutex::new(PriceCache::new(config.cache_ttl))),
        price_provider,
        resolver: Arc::new(FallbackResolver::new(catalog)),
        repository,
        metrics,
        refresh: Arc::new(RefreshHandle::new()),
        settings: config.refresh_settings(),
    });

    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, err);
            std::process::exit(1);
        });
    tracing::info!("Listening on {}", config.bind_addr);

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", err);
        std::process::exit(1);
    }

    tracing::info!("Server stopped cleanly");
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received. Stopping server.");
}
