//! Tests for the FIFO work queue

use prometheus_background_queue::core::{WorkBody, WorkItem, WorkQueue};

fn item(name: &str) -> WorkItem {
    WorkItem::new(WorkBody::sync(|_| Ok(()))).with_display_name(name)
}

#[test]
fn test_fifo_order() {
    let queue = WorkQueue::new();
    queue.push(item("a"));
    queue.push(item("b"));
    queue.push(item("c"));
    assert_eq!(queue.len(), 3);

    let names: Vec<String> = std::iter::from_fn(|| queue.try_pop())
        .map(|i| i.meta().label())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(queue.is_empty());
}

#[test]
fn test_drain_empties_queue() {
    let queue = WorkQueue::new();
    queue.push(item("a"));
    queue.push(item("b"));
    assert_eq!(queue.drain().len(), 2);
    assert!(queue.try_pop().is_none());
}

#[tokio::test]
async fn test_wait_consumes_one_permit_per_push() {
    let queue = WorkQueue::new();
    queue.push(item("a"));
    queue.wait().await.unwrap();
    assert!(queue.try_pop().is_some());

    let pending = tokio::time::timeout(std::time::Duration::from_millis(20), queue.wait()).await;
    assert!(pending.is_err());
}

#[tokio::test]
async fn test_close_releases_waiter() {
    let queue = WorkQueue::new();
    queue.close();
    assert!(queue.is_closed());
    assert!(queue.wait().await.is_err());
}
