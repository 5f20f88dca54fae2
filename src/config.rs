use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::RefreshSettings;

/// Runtime configuration, read from the environment with CLI overrides
/// applied on top. Every timing constant of the refresh engine lives
/// here rather than in the code.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote price-scraping endpoint.
    pub scraper_endpoint: String,
    /// Address the HTTP API binds to.
    pub bind_addr: String,
    /// Path of the scraped provider data file.
    pub data_file: PathBuf,
    /// SQLite URL for the check-history database.
    pub database_url: String,
    /// How long a cached quote stays fresh.
    pub cache_ttl: Duration,
    /// Per-fetch abort timer.
    pub fetch_timeout: Duration,
    /// Providers fetched concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let scraper_endpoint =
            env::var("SCRAPER_ENDPOINT").map_err(|_| "SCRAPER_ENDPOINT is required")?;

        let bind_addr = env_or("BIND_ADDR", "127.0.0.1:8080".to_string())?;
        let data_file = PathBuf::from(env_or(
            "DATA_FILE",
            "data/broadband_data.json".to_string(),
        )?);
        let database_url = env_or("DATABASE_URL", "sqlite::memory:".to_string())?;

        let cache_ttl_secs: u64 = env_or("PRICE_CACHE_TTL_SECS", 1800)?;
        let fetch_timeout_secs: u64 = env_or("FETCH_TIMEOUT_SECS", 60)?;
        let batch_size: usize = env_or("BATCH_SIZE", 10)?;
        let batch_delay_ms: u64 = env_or("BATCH_DELAY_MS", 200)?;

        if batch_size == 0 {
            return Err("BATCH_SIZE must be at least 1".to_string());
        }

        Ok(Self {
            scraper_endpoint,
            bind_addr,
            data_file,
            database_url,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            batch_size,
            batch_delay: Duration::from_millis(batch_delay_ms),
        })
    }

    /// Overlay any CLI-provided values on top of the environment.
    pub fn apply_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(endpoint) = &cli.endpoint {
            self.scraper_endpoint = endpoint.clone();
        }
        if let Some(bind) = &cli.bind {
            self.bind_addr = bind.clone();
        }
        if let Some(data_file) = &cli.data_file {
            self.data_file = data_file.clone();
        }
        if let Some(database_url) = &cli.database_url {
            self.database_url = database_url.clone();
        }
        if let Some(secs) = cli.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = cli.fetch_timeout_secs {
            self.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = cli.batch_size {
            self.batch_size = size.max(1);
        }
        if let Some(ms) = cli.batch_delay_ms {
            self.batch_delay = Duration::from_millis(ms);
        }
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            batch_size: self.batch_size,
            batch_delay: self.batch_delay,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid value", key)),
        Err(_) => Ok(default),
    }
}
