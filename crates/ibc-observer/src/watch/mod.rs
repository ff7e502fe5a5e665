// Polling waits over chain state. Every suspension point races the caller's
// cancellation token.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::WatchError;

pub mod finalization;
pub mod height;

pub use finalization::FinalizationWatcher;
pub use height::{HeightCursor, HeightWatcher};

/// Run `fut` unless `cancel` fires first
pub(crate) async fn cancellable<F, T>(
    fut: F,
    cancel: &CancellationToken,
    waiting_for: &str,
) -> Result<T, WatchError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WatchError::Cancelled(waiting_for.to_string())),
        out = fut => Ok(out),
    }
}

/// Idle between polls
pub(crate) async fn idle(
    duration: Duration,
    cancel: &CancellationToken,
    waiting_for: &str,
) -> Result<(), WatchError> {
    cancellable(tokio::time::sleep(duration), cancel, waiting_for).await
}
