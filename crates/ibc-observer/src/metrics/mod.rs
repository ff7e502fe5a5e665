// Metrics and monitoring

use prometheus::{Counter, Registry};
use std::sync::Arc;

/// Observer metrics
pub struct ObserverMetrics {
    // Watch metrics
    pub height_polls: Counter,
    pub finalization_polls: Counter,
    pub query_errors: Counter,

    // Scan metrics
    pub blocks_scanned: Counter,
    pub tx_decode_failures: Counter,

    registry: Arc<Registry>,
}

impl ObserverMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let height_polls = Counter::new("ibc_observer_height_polls_total", "Total height polls")?;
        let finalization_polls = Counter::new(
            "ibc_observer_finalization_polls_total",
            "Total rollapp finalization state polls",
        )?;
        let query_errors =
            Counter::new("ibc_observer_query_errors_total", "Total failed chain queries")?;
        let blocks_scanned =
            Counter::new("ibc_observer_blocks_scanned_total", "Total blocks scanned")?;
        let tx_decode_failures = Counter::new(
            "ibc_observer_tx_decode_failures_total",
            "Transactions skipped because they could not be decoded",
        )?;

        registry.register(Box::new(height_polls.clone()))?;
        registry.register(Box::new(finalization_polls.clone()))?;
        registry.register(Box::new(query_errors.clone()))?;
        registry.register(Box::new(blocks_scanned.clone()))?;
        registry.register(Box::new(tx_decode_failures.clone()))?;

        Ok(Self {
            height_polls,
            finalization_polls,
            query_errors,
            blocks_scanned,
            tx_decode_failures,
            registry,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registered() {
        let metrics = ObserverMetrics::new().unwrap();

        metrics.height_polls.inc();
        metrics.tx_decode_failures.inc_by(2.0);

        let families = metrics.registry().gather();
        assert_eq!(families.len(), 5);
        assert_eq!(metrics.tx_decode_failures.get(), 2.0);
    }
}
