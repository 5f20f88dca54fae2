//! Prometheus metrics registry for the broadband price tracker.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the refresh scheduler and HTTP middleware.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry,
};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Total number of refresh-all runs started.
    pub refresh_runs_total: Counter,
    /// Total number of live price fetches issued (cache misses).
    pub price_fetches_total: Counter,
    /// Total number of live price fetches that ended in failure.
    pub price_fetch_failures_total: Counter,
    /// Total number of price lookups answered from the cache.
    pub cache_hits_total: Counter,
    /// Number of providers in the directory.
    pub providers_tracked: Gauge,
    /// Number of providers currently holding a live-fetched price.
    pub live_prices_held: Gauge,
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated (should not happen in practice).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let refresh_runs_total = Counter::with_opts(Opts::new(
            "broadband_tracker_refresh_runs_total",
            "Total refresh-all runs started",
        ))?;

        let price_fetches_total = Counter::with_opts(Opts::new(
            "broadband_tracker_price_fetches_total",
            "Live price fetches issued against the scraper",
        ))?;

        let price_fetch_failures_total = Counter::with_opts(Opts::new(
            "broadband_tracker_price_fetch_failures_total",
            "Live price fetches that failed",
        ))?;

        let cache_hits_total = Counter::with_opts(Opts::new(
            "broadband_tracker_cache_hits_total",
            "Price lookups answered from the TTL cache",
        ))?;

        let providers_tracked = Gauge::with_opts(Opts::new(
            "broadband_tracker_providers_tracked",
            "Providers in the directory",
        ))?;

        let live_prices_held = Gauge::with_opts(Opts::new(
            "broadband_tracker_live_prices_held",
            "Providers currently holding a live-fetched price",
        ))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "broadband_tracker_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "broadband_tracker_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        registry.register(Box::new(refresh_runs_total.clone()))?;
        registry.register(Box::new(price_fetches_total.clone()))?;
        registry.register(Box::new(price_fetch_failures_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(providers_tracked.clone()))?;
        registry.register(Box::new(live_prices_held.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            refresh_runs_total,
            price_fetches_total,
            price_fetch_failures_total,
            cache_hits_total,
            providers_tracked,
            live_prices_held,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = AppMetrics::new();
        assert!(metrics.is_ok(), "AppMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn render_produces_non_empty_output_after_increment() {
        let metrics = AppMetrics::new().unwrap();
        metrics.refresh_runs_total.inc();
        let output = metrics.render().unwrap();
        assert!(output.contains("broadband_tracker_refresh_runs_total"));
    }

    #[test]
    fn counters_increment_correctly() {
        let metrics = AppMetrics::new().unwrap();
        metrics.price_fetches_total.inc_by(3.0);
        metrics.price_fetch_failures_total.inc();
        assert!((metrics.price_fetches_total.get() - 3.0).abs() < f64::EPSILON);
        assert!((metrics.price_fetch_failures_total.get() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gauge_set_and_get() {
        let metrics = AppMetrics::new().unwrap();
        metrics.providers_tracked.set(42.0);
        assert!((metrics.providers_tracked.get() - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn http_requests_counter_vec_labels_work() {
        let metrics = AppMetrics::new().unwrap();
        metrics
            .http_requests_total
            .with_label_values(&["GET", "/providers", "200"])
            .inc();
        let val = metrics
            .http_requests_total
            .with_label_values(&["GET", "/providers", "200"])
            .get();
        assert!((val - 1.0).abs() < f64::EPSILON);
    }
}
