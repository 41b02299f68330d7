use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Introspection metrics
    pub introspection_requests: IntCounterVec,
    pub introspection_failures: IntCounterVec,
    pub introspection_duration: Histogram,

    // Cache metrics
    pub cache_lookups: IntCounterVec,
    pub coalesced_waits: IntCounter,

    // Forward-auth responses
    pub validation_responses: IntCounterVec,

    // Config/runtime
    pub discovery_failures: IntCounter,
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokenintrospect".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Introspection
            introspection_requests: IntCounterVec::new(Opts::new("introspection_requests_total", "Introspection calls by outcome"),&["outcome"],).unwrap(),
            introspection_failures: IntCounterVec::new(Opts::new("introspection_failures_total", "Introspection failures by reason"),&["reason"],).unwrap(),
            introspection_duration: Histogram::with_opts(HistogramOpts::new("introspection_duration_seconds", "Introspection round trip seconds").buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0])).unwrap(),

            // Cache
            cache_lookups: IntCounterVec::new(Opts::new("cache_lookups_total", "Result cache lookups by result"),&["result"],).unwrap(),
            coalesced_waits: IntCounter::new("coalesced_waits_total", "Validations that joined an in-flight introspection").unwrap(),

            validation_responses: IntCounterVec::new(Opts::new("validation_responses_total", "Forward-auth responses by status"),&["status"],).unwrap(),

            // Config/runtime
            discovery_failures: IntCounter::new("discovery_failures_total", "Introspection endpoint discovery failures").unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.introspection_requests.clone())).unwrap();
        reg.register(Box::new(metrics.introspection_failures.clone())).unwrap();
        reg.register(Box::new(metrics.introspection_duration.clone())).unwrap();
        reg.register(Box::new(metrics.cache_lookups.clone())).unwrap();
        reg.register(Box::new(metrics.coalesced_waits.clone())).unwrap();
        reg.register(Box::new(metrics.validation_responses.clone())).unwrap();
        reg.register(Box::new(metrics.discovery_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
