//! Failure classification, retries, skips and host-signal recovery.

mod common;

use bridge_traits::{LifecycleState, MediaResource, ReadyState, ResourceError, ResourceEvent};
use common::{harness, queue, quiet_config, HarnessBuilder};
use core_playback::{PlaybackConfig, PlaybackStatus, RepeatMode, TrackId};
use core_runtime::events::{CoreEvent, NetworkEvent, PlaybackEvent};
use std::time::Duration;

fn network_error() -> ResourceError {
    ResourceError::Network("connection reset".into())
}

fn unsupported() -> ResourceError {
    ResourceError::SourceNotSupported("unknown codec".into())
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_then_skip() {
    let mut h = HarnessBuilder::new()
        .script(1, |r| {
            for _ in 0..3 {
                r.push_play_result(Err(network_error()));
            }
        })
        .start()
        .await;

    h.engine.play_track(TrackId(1), Some(queue(3)), None).await;
    assert_eq!(h.engine.resilience().retry_attempts(), 1);

    h.settle(Duration::from_millis(2100)).await;
    assert_eq!(h.current(), Some(1));
    assert_eq!(h.engine.resilience().retry_attempts(), 2);

    h.settle(Duration::from_millis(2100)).await;
    assert_eq!(h.current(), Some(1));

    h.settle(Duration::from_millis(1100)).await;
    assert_eq!(h.current(), Some(2));
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);

    let failed = h.resource(1);
    assert_eq!(failed.play_calls(), 3);
    assert_eq!(failed.loads().len(), 3);
    assert!(failed.is_released());
    assert_eq!(h.drain_errors(), vec![true, true, true]);
}

#[tokio::test(start_paused = true)]
async fn retry_resumes_from_last_position() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    let resource = h.resource(1);

    resource.emit(ResourceEvent::TimeUpdate { position: 42.0 });
    resource.emit(ResourceEvent::Error(network_error()));
    resource.emit(ResourceEvent::Error(network_error()));
    h.engine.process_pending().await;
    assert_eq!(h.engine.resilience().retry_attempts(), 1);

    h.settle(Duration::from_millis(2100)).await;
    assert_eq!(resource.loads().len(), 2);
    assert_eq!(resource.snapshot().position, 42.0);
    assert_eq!(resource.play_calls(), 2);
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);
    assert_eq!(h.engine.resilience().retry_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn pause_wins_over_a_retry_that_already_fired() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    let resource = h.resource(1);
    resource.emit(ResourceEvent::Error(network_error()));
    h.engine.process_pending().await;

    // The backoff elapses and queues the retry before the pause is handled.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    h.engine.pause();
    h.engine.process_pending().await;

    assert_eq!(h.engine.status(), PlaybackStatus::Paused);
    assert_eq!(h.current(), Some(1));
    assert_eq!(resource.loads().len(), 1);
    assert_eq!(resource.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn offline_failures_wait_for_reconnect() {
    let mut h = HarnessBuilder::new()
        .script(1, |r| r.push_play_result(Err(network_error())))
        .start()
        .await;
    let handle = h.engine.handle();

    handle.notify_connectivity(false).unwrap();
    h.engine.process_pending().await;
    assert!(!h.engine.is_online());

    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.settle(Duration::from_secs(30)).await;
    let resource = h.resource(1);
    assert_eq!(resource.play_calls(), 1);
    assert_eq!(h.current(), Some(1));

    handle.notify_connectivity(true).unwrap();
    h.engine.process_pending().await;
    assert_eq!(resource.loads().len(), 2);
    assert_eq!(resource.play_calls(), 2);
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);

    let mut network = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        if let CoreEvent::Network(event) = event {
            network.push(event);
        }
    }
    assert_eq!(network, vec![NetworkEvent::Offline, NetworkEvent::Online]);
}

#[tokio::test(start_paused = true)]
async fn reconnect_leaves_healthy_playback_alone() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.engine.process_pending().await;

    let handle = h.engine.handle();
    handle.notify_connectivity(false).unwrap();
    handle.notify_connectivity(true).unwrap();
    h.engine.process_pending().await;

    assert_eq!(h.resource(1).loads().len(), 1);
    assert_eq!(h.resource(1).play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn unplayable_streak_triggers_cooldown() {
    let mut builder = HarnessBuilder::new()
        .config(quiet_config().with_max_consecutive_failures(3));
    for id in 1..=4 {
        builder = builder.script(id, |r| r.push_play_result(Err(unsupported())));
    }
    let mut h = builder.start().await;

    h.engine.play_track(TrackId(1), Some(queue(5)), None).await;
    h.settle(Duration::from_millis(1100)).await;
    assert_eq!(h.current(), Some(2));
    h.settle(Duration::from_millis(1100)).await;
    assert_eq!(h.current(), Some(3));
    assert_eq!(h.engine.resilience().failure_streak(), 0);

    h.settle(Duration::from_millis(1100)).await;
    assert_eq!(h.current(), Some(3));
    h.settle(Duration::from_secs(5)).await;
    assert_eq!(h.current(), Some(3));

    h.settle(Duration::from_secs(4)).await;
    assert_eq!(h.current(), Some(4));
}

#[tokio::test(start_paused = true)]
async fn running_out_of_tracks_stops_recovery() {
    let mut h = HarnessBuilder::new()
        .script(1, |r| r.push_play_result(Err(unsupported())))
        .script(2, |r| r.push_play_result(Err(unsupported())))
        .start()
        .await;

    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.settle(Duration::from_millis(1100)).await;
    assert_eq!(h.current(), Some(2));
    h.settle(Duration::from_millis(1100)).await;

    assert_eq!(h.current(), Some(2));
    assert_eq!(h.engine.status(), PlaybackStatus::Paused);
    assert_eq!(h.drain_errors(), vec![true, true, false]);

    h.settle(Duration::from_secs(60)).await;
    assert_eq!(h.factory.created_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn play_aborted_by_a_swap_is_retried_once() {
    let mut h = HarnessBuilder::new()
        .script(1, |r| r.push_play_result(Err(ResourceError::Aborted("new load".into()))))
        .start()
        .await;

    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;

    assert_eq!(h.engine.status(), PlaybackStatus::Playing);
    assert_eq!(h.resource(1).play_calls(), 2);
    assert!(h.drain_errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn permission_denial_retries_once_then_waits_for_the_user() {
    let mut h = HarnessBuilder::new()
        .script(1, |r| {
            r.push_play_result(Err(ResourceError::NotAllowed("gesture".into())));
            r.push_play_result(Err(ResourceError::NotAllowed("gesture".into())));
        })
        .start()
        .await;

    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.settle(Duration::from_millis(600)).await;

    assert_eq!(h.engine.status(), PlaybackStatus::Paused);
    assert_eq!(h.drain_errors(), vec![true, false]);
    h.settle(Duration::from_secs(10)).await;
    assert_eq!(h.resource(1).play_calls(), 2);

    h.engine.play().await;
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);
    assert_eq!(h.resource(1).play_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn stall_retries_after_debounce() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    let resource = h.resource(1);

    resource.update_snapshot(|s| s.ready_state = ReadyState::HaveCurrentData);
    resource.emit(ResourceEvent::Stalled);
    resource.emit(ResourceEvent::Waiting);
    h.engine.process_pending().await;

    h.settle(Duration::from_secs(9)).await;
    assert!(h.drain_errors().is_empty());

    h.settle(Duration::from_millis(1100)).await;
    assert_eq!(h.drain_errors(), vec![true]);

    h.settle(Duration::from_millis(2100)).await;
    assert_eq!(resource.loads().len(), 2);
    assert_eq!(resource.play_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn progress_cancels_stall_timer() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    let resource = h.resource(1);

    resource.emit(ResourceEvent::Stalled);
    h.engine.process_pending().await;
    resource.emit(ResourceEvent::Progress);
    h.engine.process_pending().await;

    h.settle(Duration::from_secs(15)).await;
    assert!(h.drain_errors().is_empty());
    assert_eq!(resource.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn foreground_finishes_a_track_that_ended_unnoticed() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(3)), None).await;
    h.resource(1).update_snapshot(|s| {
        s.duration = Some(200.0);
        s.position = 199.6;
    });

    let handle = h.engine.handle();
    handle.notify_lifecycle(LifecycleState::Background).unwrap();
    h.engine.process_pending().await;
    assert_eq!(h.current(), Some(1));

    handle.notify_lifecycle(LifecycleState::Foreground).unwrap();
    h.engine.process_pending().await;
    assert_eq!(h.current(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn completion_after_a_foreground_finish_does_not_restart_again() {
    let mut h = harness().await;
    h.engine.set_repeat(RepeatMode::One);
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    let resource = h.resource(1);
    resource.update_snapshot(|s| {
        s.duration = Some(200.0);
        s.position = 199.8;
    });

    h.engine
        .handle()
        .notify_lifecycle(LifecycleState::Foreground)
        .unwrap();
    assert!(resource.emit(ResourceEvent::Ended));
    h.engine.process_pending().await;

    assert_eq!(h.current(), Some(1));
    assert_eq!(resource.play_calls(), 2);
    assert_eq!(resource.snapshot().position, 0.0);
}

#[tokio::test(start_paused = true)]
async fn foreground_resumes_after_platform_pause() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.engine.process_pending().await;
    let resource = h.resource(1);

    resource.pause();
    h.engine.process_pending().await;
    assert_eq!(h.engine.status(), PlaybackStatus::Paused);

    h.engine
        .handle()
        .notify_lifecycle(LifecycleState::Foreground)
        .unwrap();
    h.engine.process_pending().await;
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);
    assert_eq!(resource.play_calls(), 2);
    assert!(h
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Resumed { track_id: 1, .. })));
}

#[tokio::test(start_paused = true)]
async fn foreground_reloads_a_broken_resource() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    let resource = h.resource(1);
    resource.update_snapshot(|s| s.error = Some(network_error()));

    h.engine
        .handle()
        .notify_lifecycle(LifecycleState::Foreground)
        .unwrap();
    h.engine.process_pending().await;

    assert_eq!(resource.loads().len(), 2);
    assert_eq!(resource.play_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn foreground_respects_a_user_pause() {
    let mut h = harness().await;
    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.engine.pause();

    h.engine
        .handle()
        .notify_lifecycle(LifecycleState::Foreground)
        .unwrap();
    h.engine.process_pending().await;

    assert_eq!(h.engine.status(), PlaybackStatus::Paused);
    assert_eq!(h.resource(1).play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_is_configurable() {
    let mut h = HarnessBuilder::new()
        .config(
            PlaybackConfig::default()
                .with_preload_window(0, 0)
                .with_max_retry_attempts(1)
                .with_skip_delay(Duration::from_millis(200)),
        )
        .script(1, |r| r.push_play_result(Err(network_error())))
        .start()
        .await;

    h.engine.play_track(TrackId(1), Some(queue(2)), None).await;
    h.settle(Duration::from_millis(300)).await;
    assert_eq!(h.current(), Some(2));
    assert_eq!(h.resource(1).play_calls(), 1);
}
