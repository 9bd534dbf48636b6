use super::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn triggered_resolves_immediately_if_already_fired() {
    let shutdown = Shutdown::new();
    shutdown.trigger();
    assert!(shutdown.is_triggered());
    tokio::time::timeout(Duration::from_millis(100), shutdown.triggered())
        .await
        .expect("triggered() should resolve without waiting");
}

#[tokio::test]
async fn loop_exits_between_iterations_on_shutdown() {
    let shutdown = Shutdown::new();
    let ran = Arc::new(AtomicBool::new(false));
    let ran_clone = ran.clone();
    let loop_shutdown = shutdown.clone();

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = loop_shutdown.triggered() => break,
                _ = tokio::time::sleep(Duration::from_millis(5)) => {
                    ran_clone.store(true, Ordering::SeqCst);
                }
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.trigger();

    let mut group = WaitGroup::default();
    group.track(handle);
    group.join(Duration::from_secs(1)).await;

    assert!(ran.load(Ordering::SeqCst), "loop should have run at least once before shutdown");
}

#[tokio::test]
async fn wait_group_join_is_a_noop_with_no_tasks() {
    let group = WaitGroup::default();
    group.join(Duration::from_millis(50)).await;
}
