//! Batch price-refresh scheduler.
//!
//! Drives one "refresh all" run: clears the price cache, snapshots the
//! provider list, drops providers without a website, then works through
//! fixed-size batches. Within a batch every fetch runs concurrently and
//! the batch only completes when each fetch has settled; batches run
//! strictly in sequence with a short delay between them so the scraping
//! endpoint is never burst.
//!
//! A single provider's failure is recorded and the run continues — no
//! retries, no aborts. Progress is reported through [`RefreshEvent`]
//! messages so observers (the HTTP API, tests) never block the run.
//! Cancellation is cooperative and honoured between batches.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinSet;
use tokio::time;

use crate::cache::PriceCache;
use crate::directory::{ProviderDirectory, ProviderRecord};
use crate::metrics::AppMetrics;
use crate::pricing::error::FetchErrorKind;
use crate::pricing::provider::PriceProvider;
use crate::pricing::resolver::FallbackResolver;
use crate::pricing::types::{BatchProgress, Deal, DisplayOutcome, FetchResult, RunSummary};

/// Tuning knobs for a refresh run. Values come from `Config`.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Providers fetched concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
    /// Independent abort timer for each individual fetch.
    pub fetch_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(200),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

/// Shared collaborators of a refresh run.
pub struct RefreshContext {
    pub provider: Arc<dyn PriceProvider + Send + Sync>,
    pub cache: Arc<Mutex<PriceCache>>,
    pub resolver: Arc<FallbackResolver>,
    pub directory: Arc<RwLock<ProviderDirectory>>,
    pub metrics: Option<Arc<AppMetrics>>,
    pub settings: RefreshSettings,
}

/// Progress notifications emitted during a refresh run.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Started {
        total: usize,
    },
    ProviderResolved {
        provider: String,
        outcome: DisplayOutcome,
    },
    BatchCompleted {
        progress: BatchProgress,
    },
    Finished {
        summary: RunSummary,
    },
}

/// Run one full refresh over `providers`.
///
/// The caller passes the snapshot to refresh (normally the currently
/// filtered directory view) and receives the final [`RunSummary`];
/// the same summary is also emitted as the last event.
pub async fn run_refresh_all(
    ctx: Arc<RefreshContext>,
    providers: Vec<ProviderRecord>,
    events: UnboundedSender<RefreshEvent>,
    cancel: watch::Receiver<bool>,
) -> RunSummary {
    // A manual refresh must never be masked by stale quotes.
    ctx.cache.lock().await.clear();
    if let Some(metrics) = &ctx.metrics {
        metrics.refresh_runs_total.inc();
    }

    let (eligible, excluded): (Vec<_>, Vec<_>) =
        providers.into_iter().partition(ProviderRecord::has_website);

    for record in &excluded {
        let _ = events.send(RefreshEvent::ProviderResolved {
            provider: record.name.clone(),
            outcome: DisplayOutcome::Excluded,
        });
    }

    let total = eligible.len();
    let mut progress = BatchProgress::new(total);
    let _ = events.send(RefreshEvent::Started { total });
    tracing::info!(
        "Refreshing prices for {} providers ({} excluded)",
        total,
        excluded.len()
    );

    let batch_size = ctx.settings.batch_size.max(1);
    let batches: Vec<Vec<ProviderRecord>> = eligible
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect();
    let batch_count = batches.len();
    let mut cancelled = false;

    for (index, batch) in batches.into_iter().enumerate() {
        if *cancel.borrow() {
            cancelled = true;
            tracing::info!("Refresh cancelled after {} of {} batches", index, batch_count);
            break;
        }

        let mut tasks = JoinSet::new();
        for record in batch {
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let (outcome, live) = fetch_and_resolve(&ctx, &record).await;
                (record.name, outcome, live)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome, live)) => {
                    progress.completed += 1;
                    if outcome.counts_as_success() {
                        progress.succeeded += 1;
                    } else {
                        progress.failed += 1;
                    }
                    if let Some((deals, source)) = live {
                        ctx.directory
                            .write()
                            .await
                            .record_live_result(&name, deals, source);
                    }
                    let _ = events.send(RefreshEvent::ProviderResolved {
                        provider: name,
                        outcome,
                    });
                }
                Err(err) => {
                    progress.completed += 1;
                    progress.failed += 1;
                    tracing::error!("Price fetch task failed: {}", err);
                }
            }
        }

        let _ = events.send(RefreshEvent::BatchCompleted {
            progress: progress.clone(),
        });

        if index + 1 < batch_count {
            time::sleep(ctx.settings.batch_delay).await;
        }
    }

    if let Some(metrics) = &ctx.metrics {
        metrics
            .live_prices_held
            .set(ctx.directory.read().await.live_price_count() as f64);
    }

    let summary = RunSummary {
        total,
        succeeded: progress.succeeded,
        failed: progress.failed,
        cancelled,
    };
    tracing::info!(
        "Refresh complete: {} succeeded, {} failed",
        summary.succeeded,
        summary.failed
    );
    let _ = events.send(RefreshEvent::Finished {
        summary: summary.clone(),
    });
    summary
}

/// Check one provider's price on demand (the per-card operation).
///
/// Shares the cache and fallback path with the batch run; a successful
/// live result is written back to the directory immediately.
pub async fn check_provider_price(ctx: &RefreshContext, record: &ProviderRecord) -> DisplayOutcome {
    if !record.has_website() {
        return DisplayOutcome::Excluded;
    }

    let (outcome, live) = fetch_and_resolve(ctx, record).await;
    if let Some((deals, source)) = live {
        ctx.directory
            .write()
            .await
            .record_live_result(&record.name, deals, source);
    }
    outcome
}

/// Cache-then-fetch-then-resolve for one provider.
///
/// Returns the resolved outcome plus the live deals to record when the
/// fetch genuinely succeeded (never from cache-tier fallback data).
async fn fetch_and_resolve(
    ctx: &RefreshContext,
    record: &ProviderRecord,
) -> (DisplayOutcome, Option<(Vec<Deal>, String)>) {
    let cached = { ctx.cache.lock().await.get(&record.name) };

    let fetch = match cached {
        Some(payload) => {
            tracing::debug!("Using cached price for {}", record.name);
            if let Some(metrics) = &ctx.metrics {
                metrics.cache_hits_total.inc();
            }
            payload
        }
        None => {
            if let Some(metrics) = &ctx.metrics {
                metrics.price_fetches_total.inc();
            }
            let fetched = match time::timeout(
                ctx.settings.fetch_timeout,
                ctx.provider
                    .fetch_price(&record.name, record.website.as_deref()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => FetchResult::Failure {
                    kind: FetchErrorKind::Timeout,
                },
            };

            if matches!(fetched, FetchResult::Failure { .. }) {
                if let Some(metrics) = &ctx.metrics {
                    metrics.price_fetch_failures_total.inc();
                }
            }

            if fetched.is_cacheable() {
                ctx.cache.lock().await.put(&record.name, fetched.clone());
            }
            fetched
        }
    };

    let live = match &fetch {
        FetchResult::Success { deals, source } => Some((deals.clone(), source.clone())),
        _ => None,
    };
    (ctx.resolver.resolve(&record.name, &fetch), live)
}
