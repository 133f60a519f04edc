use prometheus::{Counter, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static::lazy_static! {
    // Scoring metrics
    pub static ref RECORDS_SCORED: Counter = Counter::with_opts(
        Opts::new("sentiscope_records_scored_total", "Total number of texts scored")
    ).expect("valid metric opts");

    pub static ref DATASETS_ANNOTATED: Counter = Counter::with_opts(
        Opts::new("sentiscope_datasets_annotated_total", "Static datasets annotated (cache misses)")
    ).expect("valid metric opts");

    pub static ref ANNOTATE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("sentiscope_annotate_duration_seconds", "Time spent loading and scoring a static dataset")
    ).expect("valid metric opts");

    // Live collection metrics
    pub static ref LIVE_COLLECTIONS: Counter = Counter::with_opts(
        Opts::new("sentiscope_live_collections_total", "Live collections executed against Reddit")
    ).expect("valid metric opts");

    pub static ref LIVE_COLLECTION_FAILURES: Counter = Counter::with_opts(
        Opts::new("sentiscope_live_collection_failures_total", "Live collections that ended in an error")
    ).expect("valid metric opts");

    pub static ref REDDIT_FETCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("sentiscope_reddit_fetch_duration_seconds", "Time spent on Reddit API calls")
    ).expect("valid metric opts");

    // Cache metrics
    pub static ref CACHE_HITS: Counter = Counter::with_opts(
        Opts::new("sentiscope_cache_hits_total", "Requests answered from a cache")
    ).expect("valid metric opts");
}

pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(RECORDS_SCORED.clone()),
            Box::new(DATASETS_ANNOTATED.clone()),
            Box::new(ANNOTATE_DURATION.clone()),
            Box::new(LIVE_COLLECTIONS.clone()),
            Box::new(LIVE_COLLECTION_FAILURES.clone()),
            Box::new(REDDIT_FETCH_DURATION.clone()),
            Box::new(CACHE_HITS.clone()),
        ];
        for collector in collectors {
            if let Err(e) = registry.register(collector) {
                error!("Failed to register metric: {}", e);
            }
        }

        Self { registry }
    }

    pub fn gather_metrics(&self) -> String {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&metric_families).unwrap_or_else(|e| {
            error!("Failed to encode metrics: {}", e);
            String::new()
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
