use std::path::PathBuf;

use clap::Parser;

/// Broadband Price Tracker CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "broadband-price-tracker",
    version,
    about = "UK broadband provider directory with live price refreshing"
)]
pub struct Cli {
    /// Base URL of the remote price-scraping endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Address for the HTTP API to bind to
    #[arg(long)]
    pub bind: Option<String>,

    /// Path to the scraped provider data file
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// SQLite URL for the check-history database
    #[arg(long)]
    pub database_url: Option<String>,

    /// Price cache time-to-live in seconds
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Per-fetch timeout in seconds
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Number of providers fetched concurrently per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Delay between batches in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,
}
