//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub builds_total: IntCounter,
    pub builds_success: IntCounter,
    pub build_failures: IntCounterVec,
    pub sends_total: IntCounter,
    pub sends_confirmed: IntCounter,
    pub send_failures: IntCounterVec,
    pub coin_pages_fetched: IntCounter,
    pub coins_merged: IntCounter,
    pub splits_total: IntCounter,

    // Histograms
    pub build_latency: Histogram,
    pub ledger_latency: Histogram,
    pub confirmation_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let builds_total = IntCounter::with_opts(Opts::new(
            "transfer_builds_total",
            "Total number of transfer builds attempted",
        ))?;

        let builds_success = IntCounter::with_opts(Opts::new(
            "transfer_builds_success",
            "Number of transfer builds that produced an operation",
        ))?;

        let build_failures = IntCounterVec::new(
            Opts::new(
                "transfer_build_failures",
                "Number of failed transfer builds by error category",
            ),
            &["category"],
        )?;

        let sends_total = IntCounter::with_opts(Opts::new(
            "transfer_sends_total",
            "Number of operations handed to the signer",
        ))?;

        let sends_confirmed = IntCounter::with_opts(Opts::new(
            "transfer_sends_confirmed",
            "Number of transfers confirmed successful by the ledger",
        ))?;

        let send_failures = IntCounterVec::new(
            Opts::new(
                "transfer_send_failures",
                "Number of failed sign, submit or confirmation steps by error category",
            ),
            &["category"],
        )?;

        let coin_pages_fetched = IntCounter::with_opts(Opts::new(
            "coin_pages_fetched",
            "Number of owned-coin pages fetched from the ledger",
        ))?;

        let coins_merged = IntCounter::with_opts(Opts::new(
            "coins_merged",
            "Number of coin objects folded in by MergeCoins",
        ))?;

        let splits_total = IntCounter::with_opts(Opts::new(
            "coin_splits_total",
            "Number of operations that split the primary coin",
        ))?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("build_latency_seconds", "Transfer build latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;

        let ledger_latency = Histogram::with_opts(
            HistogramOpts::new("ledger_latency_seconds", "Ledger request latency")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0]),
        )?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from signer hand-off to ledger confirmation",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(builds_total.clone()))?;
        registry.register(Box::new(builds_success.clone()))?;
        registry.register(Box::new(build_failures.clone()))?;
        registry.register(Box::new(sends_total.clone()))?;
        registry.register(Box::new(sends_confirmed.clone()))?;
        registry.register(Box::new(send_failures.clone()))?;
        registry.register(Box::new(coin_pages_fetched.clone()))?;
        registry.register(Box::new(coins_merged.clone()))?;
        registry.register(Box::new(splits_total.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(ledger_latency.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            builds_total,
            builds_success,
            build_failures,
            sends_total,
            sends_confirmed,
            send_failures,
            coin_pages_fetched,
            coins_merged,
            splits_total,
            build_latency,
            ledger_latency,
            confirmation_latency,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Count a failed build under its error category
    pub fn record_failure(&self, category: &str) {
        self.build_failures.with_label_values(&[category]).inc();
    }

    /// Count a failed send under its error category
    pub fn record_send_failure(&self, category: &str) {
        self.send_failures.with_label_values(&[category]).inc();
    }
}

/// Global metrics instance
///
/// `None` only if the registry rejected a metric at startup, in which case
/// the failure is logged once and recording becomes a no-op.
pub fn metrics() -> Option<&'static Metrics> {
    static METRICS: once_cell::sync::Lazy<Option<Metrics>> =
        once_cell::sync::Lazy::new(|| match Metrics::new() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize metrics");
                None
            }
        });
    METRICS.as_ref()
}

/// Run `f` against the global metrics, if available
pub fn record(f: impl FnOnce(&Metrics)) {
    if let Some(m) = metrics() {
        f(m);
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
    histogram_name: Option<String>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            histogram_name: None,
        }
    }

    /// Create a timer with a histogram name for automatic recording
    pub fn with_name(histogram_name: &str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name: Some(histogram_name.to_string()),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Finish the timer and record to the associated histogram
    pub fn finish(self) {
        let Some(name) = self.histogram_name else {
            return;
        };
        let duration = self.start.elapsed().as_secs_f64();
        record(|m| match name.as_str() {
            "build_latency_seconds" => m.build_latency.observe(duration),
            "ledger_latency_seconds" => m.ledger_latency.observe(duration),
            "confirmation_latency_seconds" => m.confirmation_latency.observe(duration),
            _ => tracing::debug!("Unknown histogram name: {}", name),
        });
    }
}
