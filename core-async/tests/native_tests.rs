//! Integration tests for core-async on the tokio runtime.

use core_async::sync::{mpsc, CancellationToken};
use core_async::time::{self, Duration, Timer, TimerSlot};
use core_async::task;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test]
async fn test_timeout_failure() {
    let result = time::timeout(Duration::from_millis(10), async {
        time::sleep(Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_timer_posts_into_channel() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _timer = Timer::after(Duration::from_secs(3), move || {
        let _ = tx.send("stall-check");
    });

    let received = rx.recv().await;
    assert_eq!(received, Some("stall-check"));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_slot_cancels_timer() {
    let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
    {
        let mut slot = TimerSlot::new();
        let tx = tx.clone();
        slot.arm(Duration::from_secs(1), move || {
            let _ = tx.send(1);
        });
    }
    drop(tx);

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_cancellation_token_clones_share_state() {
    let token = CancellationToken::new();
    let observer = token.clone();

    let waiter = task::spawn(async move {
        observer.cancelled().await;
        true
    });

    token.cancel();
    assert!(waiter.await.unwrap());
}
