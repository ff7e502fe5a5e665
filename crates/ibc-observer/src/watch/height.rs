// Wait for a chain to advance by a number of blocks

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{cancellable, idle};
use crate::chains::ChainQuery;
use crate::error::WatchError;
use crate::metrics::ObserverMetrics;

/// Heights seen by one in-flight wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeightCursor {
    pub starting: u64,
    pub current: u64,
}

impl HeightCursor {
    /// Record an observed height. Zero means "not available yet" and is ignored.
    pub fn observe(&mut self, height: u64) {
        if height == 0 {
            return;
        }
        if self.starting == 0 {
            self.starting = height;
        }
        self.current = height;
    }

    pub fn delta(&self) -> u64 {
        if self.starting == 0 {
            0
        } else {
            self.current.saturating_sub(self.starting)
        }
    }
}

pub struct HeightWatcher {
    chain: Arc<dyn ChainQuery>,
    poll_interval: Duration,
    metrics: Option<Arc<ObserverMetrics>>,
}

impl HeightWatcher {
    pub fn new(chain: Arc<dyn ChainQuery>, poll_interval: Duration) -> Self {
        Self {
            chain,
            poll_interval,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ObserverMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Block until the chain height has advanced by at least `delta` from the
    /// first non-zero height observed. Query errors abort the wait.
    pub async fn wait_for_delta(
        &self,
        delta: u64,
        cancel: &CancellationToken,
    ) -> Result<HeightCursor, WatchError> {
        let mut cursor = HeightCursor::default();
        if delta == 0 {
            return Ok(cursor);
        }

        let waiting_for = format!("{} to advance {} blocks", self.chain.chain_id(), delta);

        loop {
            let height = cancellable(self.chain.latest_height(), cancel, &waiting_for)
                .await?
                .map_err(|e| {
                    if let Some(metrics) = &self.metrics {
                        metrics.query_errors.inc();
                    }
                    e
                })?;
            if let Some(metrics) = &self.metrics {
                metrics.height_polls.inc();
            }

            cursor.observe(height);
            debug!(
                chain_id = %self.chain.chain_id(),
                height,
                starting = cursor.starting,
                delta = cursor.delta(),
                "Polled height"
            );

            if cursor.delta() >= delta {
                info!(
                    chain_id = %self.chain.chain_id(),
                    from = cursor.starting,
                    to = cursor.current,
                    "Chain advanced"
                );
                return Ok(cursor);
            }

            idle(self.poll_interval, cancel, &waiting_for).await?;
        }
    }
}
