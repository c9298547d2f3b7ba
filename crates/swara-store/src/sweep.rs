//! Background eviction of expired artifacts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::ArtifactStore;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Spawn a task that sweeps `store` every `interval` until `cancel` fires.
///
/// The first sweep runs immediately. `interval` must be non-zero.
pub fn spawn_sweep_task(
    store: Arc<dyn ArtifactStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Artifact sweep task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    store.sweep();
                }
            }
        }
    })
}
