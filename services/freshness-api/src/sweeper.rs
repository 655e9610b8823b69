use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::share_store::ShareStore;

/// Periodically evicts expired shares until `shutdown` fires.
pub fn spawn_sweeper(
    store: Arc<ShareStore>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("share sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.sweep().await;
                    if removed > 0 {
                        let remaining = store.len().await;
                        info!(removed, remaining, "expired shares swept");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use freshness::{assemble, AnalysisSource};

    #[tokio::test]
    async fn sweeper_evicts_and_stops_on_cancel() {
        let store = Arc::new(ShareStore::new(Duration::from_millis(1)));
        let batch = assemble(vec![], AnalysisSource::Heuristic, Utc::now());
        store.create(batch, None).await;

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(store.clone(), Duration::from_millis(10), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.len().await, 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
