use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::metrics::counter::Counter;

/// Metrics for the racer.
#[derive(Default)]
pub struct Metrics {
    /// Number of queries answered by a provider
    pub resolved: Counter,
    /// Number of queries where every provider failed
    pub all_failed: Counter,
    /// Number of queries that hit their deadline
    pub timed_out: Counter,
    /// Number of individual provider failures
    pub provider_failures: Counter,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: &E) -> Self {
        let metrics = Self::default();
        context.register(
            "resolved",
            "Number of queries answered by a provider",
            metrics.resolved.clone(),
        );
        context.register(
            "all_failed",
            "Number of queries where every provider failed",
            metrics.all_failed.clone(),
        );
        context.register(
            "timed_out",
            "Number of queries that hit their deadline",
            metrics.timed_out.clone(),
        );
        context.register(
            "provider_failures",
            "Number of individual provider failures",
            metrics.provider_failures.clone(),
        );
        metrics
    }
}
