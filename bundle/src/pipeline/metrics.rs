use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::metrics::{counter::Counter, gauge::Gauge};

/// Metrics for the pipeline.
#[derive(Default)]
pub struct Metrics {
    /// Base of the bundle currently being considered
    pub current: Gauge,
    /// Number of bundles filtered and uploaded
    pub processed: Counter,
    /// Number of bundles skipped because they already existed at the destination
    pub skipped: Counter,
    /// Number of polls for a bundle missing from the source
    pub waits: Counter,
    /// Number of filtered blocks uploaded
    pub blocks: Counter,
    /// Number of failed bundle attempts that were retried
    pub retries: Counter,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: &E) -> Self {
        let metrics = Self::default();
        context.register(
            "current",
            "Base of the bundle currently being considered",
            metrics.current.clone(),
        );
        context.register(
            "processed",
            "Number of bundles filtered and uploaded",
            metrics.processed.clone(),
        );
        context.register(
            "skipped",
            "Number of bundles skipped because they already existed at the destination",
            metrics.skipped.clone(),
        );
        context.register(
            "waits",
            "Number of polls for a bundle missing from the source",
            metrics.waits.clone(),
        );
        context.register(
            "blocks",
            "Number of filtered blocks uploaded",
            metrics.blocks.clone(),
        );
        context.register(
            "retries",
            "Number of failed bundle attempts that were retried",
            metrics.retries.clone(),
        );
        metrics
    }
}
