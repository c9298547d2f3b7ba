use std::sync::Arc;
use std::time::Duration;

use swara_store::{spawn_sweep_task, ArtifactStore, ManualClock, TtlArtifactStore};
use tokio_util::sync::CancellationToken;

async fn wait_until_empty(store: &dyn ArtifactStore) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !store.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("sweep task never evicted the artifact");
}

#[tokio::test]
async fn sweep_task_evicts_expired_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subtitles_a.csv");
    std::fs::write(&path, "start,end,note\r\n").unwrap();

    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(TtlArtifactStore::with_clock(
        Duration::from_secs(600),
        clock.clone(),
    ));
    store.insert("a", path.clone());

    let cancel = CancellationToken::new();
    let handle = spawn_sweep_task(store.clone(), Duration::from_millis(10), cancel.clone());

    // Several sweeps pass with nothing expired
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(store.len(), 1);
    assert!(path.exists());

    clock.advance(Duration::from_secs(601));
    wait_until_empty(store.as_ref()).await;
    assert!(!path.exists());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn sweep_task_stops_on_cancel() {
    let store = TtlArtifactStore::new_shared(Duration::from_secs(600));
    let cancel = CancellationToken::new();
    let handle = spawn_sweep_task(store, Duration::from_secs(3600), cancel.clone());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweep task ignored cancellation")
        .unwrap();
}
