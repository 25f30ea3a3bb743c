//! Resource events, failures and the timers that recover from them.

use super::events::{post_timer, RecoveryAction, TimerKind};
use super::{PlaybackEngine, PlaybackStatus};
use crate::error::PlaybackError;
use crate::listeners::InstanceId;
use crate::resilience::RecoveryDecision;
use bridge_traits::{LifecycleState, ReadyState, ResourceEvent};
use core_runtime::events::{CoreEvent, NetworkEvent, PlaybackEvent};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Longest gap between two time updates that still counts as listening.
const MAX_PLAYTIME_STEP_SECS: f64 = 5.0;

impl PlaybackEngine {
    pub(super) async fn on_resource_event(&mut self, instance: InstanceId, event: ResourceEvent) {
        if !self.is_active(instance) {
            trace!("Dropping {:?} from retired instance {}", event, instance);
            return;
        }

        match event {
            ResourceEvent::Playing => {
                self.resilience.on_decode_confirmed();
                self.stall_timer.disarm();
                if !self.transitioning {
                    self.status = PlaybackStatus::Playing;
                }
            }
            ResourceEvent::Paused => {
                if self.transitioning {
                    debug!("Ignoring pause fired during a swap");
                    return;
                }
                let still_paused = self
                    .active_resource()
                    .is_some_and(|resource| resource.snapshot().paused);
                if still_paused && self.status == PlaybackStatus::Playing {
                    debug!("Resource paused outside of a user request");
                    self.status = PlaybackStatus::Paused;
                    self.sync_session_state();
                }
            }
            ResourceEvent::TimeUpdate { position } => self.on_time_update(instance, position),
            ResourceEvent::Waiting | ResourceEvent::Stalled => {
                if self.transitioning {
                    return;
                }
                if self.stall_timer.arm_if_idle(
                    self.config.stall_timeout,
                    post_timer(&self.tx, TimerKind::Stall(instance)),
                ) {
                    debug!("Stall detected, waiting {:?}", self.config.stall_timeout);
                }
            }
            ResourceEvent::Progress | ResourceEvent::CanPlayThrough => {
                self.stall_timer.disarm();
            }
            ResourceEvent::LoadedMetadata { duration } => {
                if let Some(track) = self.current.as_mut() {
                    if duration.is_finite() && duration > 0.0 {
                        track.duration = Some(duration);
                    }
                }
            }
            ResourceEvent::Ended => {
                self.handle_end_of_track().await;
            }
            ResourceEvent::Error(error) => {
                if self.transitioning || self.recovery_timer.is_armed() {
                    debug!("Recovery already pending, ignoring error: {}", error);
                    return;
                }
                warn!("Active resource reported an error: {}", error);
                self.handle_failure(error.into());
            }
        }
    }

    fn on_time_update(&mut self, instance: InstanceId, position: f64) {
        if let Some(last) = self.last_position {
            let step = position - last;
            if step > 0.0 && step < MAX_PLAYTIME_STEP_SECS {
                self.total_playtime_secs += step;
                self.mark_session_dirty();
            }
        }
        self.last_position = Some(position);

        let Some(resource) = self.active_resource() else {
            return;
        };
        let duration = resource.snapshot().duration;

        let second = position.max(0.0).floor() as u64;
        if self.last_reported_second != Some(second) {
            self.last_reported_second = Some(second);
            if let Some(id) = self.current_id() {
                self.emit(PlaybackEvent::PositionChanged {
                    track_id: id.0,
                    position_ms: (position.max(0.0) * 1000.0) as u64,
                    duration_ms: duration
                        .filter(|d| d.is_finite())
                        .map_or(0, |d| (d * 1000.0) as u64),
                });
            }
        }

        if self.end_handled {
            return;
        }
        let remaining = duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d - position).max(0.0));
        if let Some(remaining) = remaining {
            if remaining <= self.config.end_proximity.as_secs_f64() {
                let delay = Duration::from_secs_f64(remaining) + self.config.end_fallback_grace;
                if self
                    .end_timer
                    .arm_if_idle(delay, post_timer(&self.tx, TimerKind::EndFallback(instance)))
                {
                    trace!("End fallback armed for {:?}", delay);
                }
            }
        }
    }

    /// Classify a failure of the active track and schedule the recovery.
    pub(super) fn handle_failure(&mut self, error: PlaybackError) {
        let Some(instance) = self.active_instance() else {
            return;
        };
        self.stall_timer.disarm();

        let decision = self.resilience.on_error(error.kind());
        self.emit(PlaybackEvent::Error {
            track_id: self.current_id().map(|id| id.0),
            message: error.to_string(),
            recoverable: decision != RecoveryDecision::AwaitInteraction,
        });

        let action = match decision {
            RecoveryDecision::AwaitReconnect => {
                info!("Offline, holding retries until the connection returns");
                self.recovery_timer.disarm();
                return;
            }
            RecoveryDecision::AwaitInteraction => {
                info!("Waiting for user interaction: {}", error);
                self.recovery_timer.disarm();
                self.intent_playing = false;
                self.status = PlaybackStatus::Paused;
                self.sync_session_state();
                return;
            }
            RecoveryDecision::Retry { attempt, .. } => {
                info!("Retrying track (attempt {})", attempt);
                RecoveryAction::Reload
            }
            RecoveryDecision::RetryPlay { .. } => RecoveryAction::RetryPlay,
            RecoveryDecision::Skip { .. } => RecoveryAction::Skip,
            RecoveryDecision::Cooldown { delay } => {
                info!("Cooling down for {:?} before the next track", delay);
                RecoveryAction::Skip
            }
        };

        let delay = decision.delay().unwrap_or_default();
        self.recovery_timer.arm(
            delay,
            post_timer(&self.tx, TimerKind::Recovery(instance, action)),
        );
    }

    pub(super) async fn run_recovery(&mut self, action: RecoveryAction) {
        // The timer may have fired before a pause that was handled first.
        if !self.intent_playing {
            debug!("Paused since the failure, dropping recovery {:?}", action);
            return;
        }
        debug!("Running recovery action {:?}", action);
        match action {
            RecoveryAction::Reload => {
                if !self.resilience.is_online() {
                    info!("Went offline before the retry, waiting for reconnect");
                    return;
                }
                self.reload_active().await;
            }
            RecoveryAction::RetryPlay => {
                let Some(resource) = self.active_resource() else {
                    return;
                };
                self.intent_playing = true;
                match self.start_playback(&resource).await {
                    Ok(()) => {
                        self.status = PlaybackStatus::Playing;
                        self.sync_session_state();
                    }
                    Err(error) => self.handle_failure(error),
                }
            }
            RecoveryAction::Skip => {
                if !self.skip_forward().await {
                    self.on_exhausted();
                }
            }
        }
    }

    /// Nothing left to skip to. Stay on the failed track until the user or a
    /// reconnect does something.
    fn on_exhausted(&mut self) {
        let error = PlaybackError::Exhausted("no playable track left".to_string());
        warn!("{}", error);
        self.status = PlaybackStatus::Paused;
        self.emit(PlaybackEvent::Error {
            track_id: self.current_id().map(|id| id.0),
            message: error.to_string(),
            recoverable: false,
        });
        self.sync_session_state();
    }

    /// Reload the active track from its locator and resume where it was.
    pub(super) async fn reload_active(&mut self) {
        let (Some(resource), Some(track_id)) = (self.active_resource(), self.current_id()) else {
            return;
        };
        let position = self
            .last_position
            .unwrap_or_else(|| resource.snapshot().position);
        let locator = self.resolver.resolve(track_id);
        info!("Reloading track {} at {:.1}s", track_id, position);

        self.stall_timer.disarm();
        self.end_timer.disarm();
        resource.load(&locator);
        if position > 0.0 {
            resource.seek(position);
        }
        self.status = PlaybackStatus::Loading;
        self.intent_playing = true;

        match self.start_playback(&resource).await {
            Ok(()) => {
                self.status = PlaybackStatus::Playing;
                self.sync_session_state();
            }
            Err(error) => self.handle_failure(error),
        }
    }

    pub(super) async fn on_stall_timeout(&mut self) {
        let Some(resource) = self.active_resource() else {
            return;
        };
        let snapshot = resource.snapshot();
        if snapshot.ready_state.can_play() || snapshot.paused {
            debug!("Stall resolved before the debounce fired");
            return;
        }
        if !self.resilience.is_online() {
            debug!("Stalled while offline, waiting for reconnect");
            return;
        }
        warn!("Stalled for {:?}, retrying", self.config.stall_timeout);
        self.handle_failure(PlaybackError::TransientNetwork(format!(
            "stalled for {:?}",
            self.config.stall_timeout
        )));
    }

    pub(super) async fn on_end_fallback(&mut self) {
        if !self.intent_playing || self.end_handled {
            return;
        }
        info!("Completion was not signalled, finishing track");
        self.handle_end_of_track().await;
    }

    pub(super) async fn on_connectivity(&mut self, online: bool) {
        let was_online = self.resilience.is_online();
        let reconnected = self.resilience.set_online(online);
        if was_online != online {
            let event = if online {
                NetworkEvent::Online
            } else {
                NetworkEvent::Offline
            };
            let _ = self.event_bus.emit(CoreEvent::Network(event));
        }

        if !reconnected || !self.intent_playing || self.transitioning {
            return;
        }
        if self.is_producing_output() {
            debug!("Reconnected while still playing, nothing to do");
            return;
        }
        info!("Reconnected, reloading the current track");
        self.recovery_timer.disarm();
        self.reload_active().await;
    }

    pub(super) async fn on_lifecycle(&mut self, state: LifecycleState) {
        if !state.is_visible() {
            debug!("App moved to {:?}", state);
            return;
        }
        if !self.intent_playing || self.transitioning {
            return;
        }
        let Some(resource) = self.active_resource() else {
            return;
        };
        let snapshot = resource.snapshot();

        let near_end = snapshot
            .remaining()
            .is_some_and(|remaining| remaining <= self.config.end_proximity.as_secs_f64());
        if near_end && !self.end_handled {
            info!("Back in foreground at the end of the track");
            self.handle_end_of_track().await;
        } else if snapshot.error.is_some()
            || (!snapshot.paused && snapshot.ready_state <= ReadyState::HaveMetadata)
        {
            info!("Back in foreground with a broken resource, reloading");
            self.recovery_timer.disarm();
            self.reload_active().await;
        } else if snapshot.paused {
            info!("Back in foreground after a platform pause, resuming");
            self.play().await;
        }
    }

    /// Audio is coming out right now.
    fn is_producing_output(&self) -> bool {
        self.status == PlaybackStatus::Playing
            && self.active_resource().is_some_and(|resource| {
                let snapshot = resource.snapshot();
                !snapshot.paused && snapshot.error.is_none() && snapshot.ready_state.can_play()
            })
    }

    /// Cancel the timers bound to the active instance.
    pub(super) fn disarm_track_timers(&mut self) {
        self.stall_timer.disarm();
        self.end_timer.disarm();
        self.recovery_timer.disarm();
    }
}
