// Rollapp finalization tracking against the hub

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{cancellable, idle};
use crate::chains::{BlockDescriptor, ChainQuery, RollappState};
use crate::error::{DecodeError, WatchError};
use crate::metrics::ObserverMetrics;

/// Polls the hub for a rollapp's finalized state.
///
/// The same interval separates retries after a failed query and after a
/// query that did not contain the target height.
pub struct FinalizationWatcher {
    hub: Arc<dyn ChainQuery>,
    poll_interval: Duration,
    metrics: Option<Arc<ObserverMetrics>>,
}

impl FinalizationWatcher {
    pub fn new(hub: Arc<dyn ChainQuery>, poll_interval: Duration) -> Self {
        Self {
            hub,
            poll_interval,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ObserverMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Wait until `target` appears among the finalized block descriptors of
    /// `rollapp_id`.
    ///
    /// `timeout` is measured from this call. A failed query inside the budget
    /// is retried; one at or past the budget is returned as
    /// [`WatchError::QueryFailedAfterTimeout`]. When the height is still
    /// missing and less than one interval remains, returns
    /// [`WatchError::HeightNotFound`] without sleeping again.
    pub async fn wait_for_finalized_height(
        &self,
        rollapp_id: &str,
        target: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), WatchError> {
        let started = Instant::now();
        let waiting_for = format!("rollapp {} height {} to finalize", rollapp_id, target);

        loop {
            let query = self.hub.rollapp_state(rollapp_id, true);
            let outcome = cancellable(query, cancel, &waiting_for).await?;
            if let Some(metrics) = &self.metrics {
                metrics.finalization_polls.inc();
            }
            let elapsed = started.elapsed();

            match outcome {
                Ok(state) => {
                    if contains_height(state.block_descriptors(), target) {
                        info!(rollapp_id, height = target, ?elapsed, "Rollapp height finalized");
                        return Ok(());
                    }

                    if timeout.saturating_sub(elapsed) < self.poll_interval {
                        return Err(WatchError::HeightNotFound {
                            height: target,
                            timeout,
                        });
                    }
                    debug!(rollapp_id, height = target, ?elapsed, "Height not finalized yet");
                }
                Err(source) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.query_errors.inc();
                    }
                    if elapsed >= timeout {
                        return Err(WatchError::QueryFailedAfterTimeout { elapsed, source });
                    }
                    warn!(
                        rollapp_id,
                        error = %source,
                        ?elapsed,
                        "Rollapp state query failed, retrying"
                    );
                }
            }

            idle(self.poll_interval, cancel, &waiting_for).await?;
        }
    }

    /// Height of the last finalized rollapp block
    pub async fn finalized_state_height(&self, rollapp_id: &str) -> Result<u64, WatchError> {
        let state = self.finalized_state(rollapp_id).await?;
        let last = state
            .block_descriptors()
            .last()
            .ok_or_else(|| WatchError::NoFinalizedState {
                rollapp_id: rollapp_id.to_string(),
            })?;

        last.parsed_height()
            .ok_or_else(|| DecodeError::invalid_integer("height", &last.height).into())
    }

    /// Hub height at which the latest finalized state was created
    pub async fn finalized_hub_height(&self, rollapp_id: &str) -> Result<u64, WatchError> {
        let state = self.finalized_state(rollapp_id).await?;
        let creation = state.creation_height();

        creation
            .parse()
            .map_err(|_| DecodeError::invalid_integer("creationHeight", creation).into())
    }

    async fn finalized_state(&self, rollapp_id: &str) -> Result<RollappState, WatchError> {
        self.hub.rollapp_state(rollapp_id, true).await.map_err(|e| {
            if let Some(metrics) = &self.metrics {
                metrics.query_errors.inc();
            }
            WatchError::Query(e)
        })
    }
}

/// First-match scan in returned order. Unparsable heights never match.
fn contains_height(descriptors: &[BlockDescriptor], target: u64) -> bool {
    descriptors.iter().any(|bd| bd.parsed_height() == Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_height() {
        let descriptors = vec![
            BlockDescriptor::new(50),
            BlockDescriptor {
                height: "garbage".to_string(),
                state_root: String::new(),
            },
            BlockDescriptor::new(100),
        ];

        assert!(contains_height(&descriptors, 100));
        assert!(!contains_height(&descriptors, 75));
        assert!(!contains_height(&[], 1));
    }
}
