//! Tests for tokio spawner and hosted queue

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_background_queue::builders::BackgroundQueueBuilder;
use prometheus_background_queue::core::{QueueError, RunState, Spawn};
use prometheus_background_queue::runtime::{HostedQueue, TokioSpawner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_tokio_spawner_requires_runtime() {
    assert!(matches!(
        TokioSpawner::try_current(),
        Err(QueueError::Runtime(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hosted_queue_runs_and_stops() {
    let queue = BackgroundQueueBuilder::new().build().unwrap();
    let hosted = HostedQueue::start(queue).unwrap();

    let done = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = tokio::sync::oneshot::channel();
    {
        let done = Arc::clone(&done);
        hosted
            .queue()
            .enqueue_async(move |_| async move {
                done.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
                Ok(())
            })
            .unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 1);

    hosted.stop(Duration::from_secs(5)).await.unwrap();
    assert!(hosted.queue().is_disposed());
    assert_eq!(hosted.queue().run_state(), RunState::Stopped);
    assert!(hosted.lifetime().is_cancelled());

    // Second stop is a no-op.
    hosted.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_hosted_queue_rejects_second_run_loop() {
    let queue = BackgroundQueueBuilder::new().build().unwrap();
    let hosted = HostedQueue::start(queue.clone()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !queue.is_running() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let err = queue
        .run(tokio_util::sync::CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, QueueError::AlreadyRunning);

    hosted.stop(Duration::from_secs(5)).await.unwrap();
}
