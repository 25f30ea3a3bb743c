//! User-facing transport controls, the sleep timer, session persistence and
//! the platform media session.

use super::events::{post_timer, Command, EngineEvent, TimerKind};
use super::transitions::Navigation;
use super::{PlaybackEngine, PlaybackStatus};
use crate::models::{RepeatMode, TrackRange};
use crate::session::{PersistedSession, SleepTimerState};
use bridge_traits::{Artwork, MediaAction, MediaMetadata, SessionPlaybackState};
use core_async::time::Instant;
use core_runtime::events::PlaybackEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const ARTWORK_SIZE: &str = "192x192";
const ARTWORK_MIME: &str = "image/png";

impl PlaybackEngine {
    /// Resume the active track, or start the queue's current track when
    /// nothing is bound yet.
    pub async fn play(&mut self) {
        if self.transitioning {
            return;
        }
        let Some(resource) = self.active_resource() else {
            let Some(track) = self.queue.current().cloned() else {
                debug!("Nothing to play");
                return;
            };
            let index = self.queue.index();
            self.transition_to(track, Some(index), Navigation::Direct)
                .await;
            return;
        };

        self.intent_playing = true;
        match self.start_playback(&resource).await {
            Ok(()) => {
                self.status = PlaybackStatus::Playing;
                if let Some(id) = self.current_id() {
                    self.emit(PlaybackEvent::Resumed {
                        track_id: id.0,
                        position_ms: self.position_ms(),
                    });
                }
                self.sync_session_state();
            }
            Err(error) => {
                warn!("Resume failed: {}", error);
                self.handle_failure(error);
            }
        }
    }

    pub fn pause(&mut self) {
        self.intent_playing = false;
        self.stall_timer.disarm();
        self.recovery_timer.disarm();

        let Some(resource) = self.active_resource() else {
            return;
        };
        resource.pause();
        if self.status != PlaybackStatus::Paused {
            self.status = PlaybackStatus::Paused;
            if let Some(id) = self.current_id() {
                self.emit(PlaybackEvent::Paused {
                    track_id: id.0,
                    position_ms: self.position_ms(),
                });
            }
            self.sync_session_state();
        }
    }

    pub async fn toggle_play(&mut self) {
        if self.intent_playing {
            self.pause();
        } else {
            self.play().await;
        }
    }

    /// Jump to `position` seconds, clamped to the known duration.
    pub fn seek(&mut self, position: f64) {
        let Some(resource) = self.active_resource() else {
            return;
        };
        if !position.is_finite() {
            return;
        }
        let duration = resource
            .snapshot()
            .duration
            .filter(|d| d.is_finite() && *d > 0.0);
        let target = match duration {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        };
        resource.seek(target);
        self.last_position = Some(target);
        self.last_reported_second = None;

        let away_from_end =
            duration.map_or(true, |d| d - target > self.config.end_proximity.as_secs_f64());
        if away_from_end {
            self.end_timer.disarm();
            self.end_handled = false;
        }
        debug!("Seeked to {:.1}s", target);
    }

    /// Set the volume in `[0, 1]`. A non-zero volume unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if self.volume > 0.0 {
            self.muted = false;
        }
        if let Some(resource) = self.active_resource() {
            resource.set_volume(self.volume);
            resource.set_muted(self.muted);
        }
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        if let Some(resource) = self.active_resource() {
            resource.set_muted(self.muted);
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.mode.shuffle);
    }

    /// Switch shuffle on or off. The history capacity follows the mode.
    pub fn set_shuffle(&mut self, shuffle: bool) {
        if self.mode.shuffle == shuffle {
            return;
        }
        self.mode.shuffle = shuffle;
        self.history
            .set_capacity(self.config.history_capacity_for(shuffle));
        info!("Shuffle {}", if shuffle { "on" } else { "off" });
        if self.active.is_some() {
            self.schedule_prefetch();
        }
    }

    /// Step through none → all → one → none.
    pub fn cycle_repeat(&mut self) -> RepeatMode {
        let repeat = self.mode.repeat.next();
        self.set_repeat(repeat);
        repeat
    }

    pub fn set_repeat(&mut self, repeat: RepeatMode) {
        if self.mode.repeat != repeat {
            info!("Repeat mode {:?}", repeat);
        }
        self.mode.repeat = repeat;
    }

    /// Restrict automatic advancing to track ids inside `range`.
    pub fn set_range(&mut self, range: Option<TrackRange>) {
        self.range = range;
        info!("Track range set to {:?}", range);
        self.mark_session_dirty();
    }

    /// Pause after `duration`; `None` or zero clears the timer.
    pub fn set_sleep_timer(&mut self, duration: Option<Duration>) {
        match duration.filter(|d| !d.is_zero()) {
            Some(duration) => {
                info!("Sleep timer set for {:?}", duration);
                self.arm_sleep_timer(duration);
            }
            None => {
                debug!("Sleep timer cleared");
                self.sleep_timer.disarm();
                self.sleep_deadline = None;
            }
        }
        self.mark_session_dirty();
    }

    pub(super) fn arm_sleep_timer(&mut self, remaining: Duration) {
        self.sleep_deadline = Some(Instant::now() + remaining);
        self.sleep_timer
            .arm(remaining, post_timer(&self.tx, TimerKind::SleepTimer));
    }

    pub(super) async fn on_sleep_timer_expired(&mut self) {
        // A firing from a timer that was replaced after it was queued.
        let due = self
            .sleep_deadline
            .is_some_and(|deadline| Instant::now() >= deadline);
        if !due {
            return;
        }
        info!("Sleep timer expired, pausing playback");
        self.sleep_deadline = None;
        self.pause();
        self.emit(PlaybackEvent::SleepTimerExpired);
        self.mark_session_dirty();
    }

    /// Schedule a write of the persisted session. Writes are throttled to one
    /// per `persist_interval`.
    pub(super) fn mark_session_dirty(&mut self) {
        if self.sessions.is_none() {
            return;
        }
        self.session_dirty = true;
        self.persist_timer.arm_if_idle(
            self.config.persist_interval,
            post_timer(&self.tx, TimerKind::Persist),
        );
    }

    pub(super) async fn persist_now(&mut self) {
        if !self.session_dirty {
            return;
        }
        let Some(sessions) = self.sessions.clone() else {
            return;
        };
        let now = sessions.now_millis();
        let session = PersistedSession {
            total_playtime_secs: self.total_playtime_secs,
            sleep_timer: self
                .sleep_timer_remaining()
                .filter(|remaining| !remaining.is_zero())
                .map(|remaining| SleepTimerState::new(remaining, now)),
            range: self.range,
            first_run: false,
        };
        match sessions.save(&session).await {
            Ok(()) => self.session_dirty = false,
            Err(e) => warn!("Failed to persist playback session: {}", e),
        }
    }

    /// Flush the session, stop the active resource and drop the cache.
    pub(super) async fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        info!("Shutting down playback engine");
        self.persist_timer.disarm();
        self.persist_now().await;

        self.disarm_track_timers();
        self.sleep_timer.disarm();
        self.intent_playing = false;
        if let Some(active) = self.active.take() {
            Self::retire(active);
        }
        let released = self.cache.clear();
        debug!("Released {} cached resources", released);

        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
        self.status = PlaybackStatus::Idle;
        self.stopped = true;
    }

    /// Push the current track to the platform media controls and route
    /// their actions back into the engine.
    pub(super) fn publish_media_session(&self) {
        let (Some(session), Some(track)) = (&self.media_session, &self.current) else {
            return;
        };

        let artwork = self
            .config
            .artwork_url
            .iter()
            .map(|src| Artwork {
                src: src.clone(),
                sizes: ARTWORK_SIZE.to_string(),
                mime_type: ARTWORK_MIME.to_string(),
            })
            .collect();
        session.set_metadata(MediaMetadata {
            title: track.title.clone(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: None,
            artwork,
        });

        for action in MediaAction::ALL {
            let tx = self.tx.clone();
            session.set_action_handler(
                action,
                Arc::new(move |action: MediaAction| {
                    let command = match action {
                        MediaAction::Play => Command::Play,
                        MediaAction::Pause => Command::Pause,
                        MediaAction::NextTrack => Command::Next,
                        MediaAction::PreviousTrack => Command::Previous,
                    };
                    let _ = tx.send(EngineEvent::Command(command));
                }),
            );
        }
        self.sync_session_state();
    }

    /// Mirror the playback status on the platform media controls.
    pub(super) fn sync_session_state(&self) {
        let Some(session) = &self.media_session else {
            return;
        };
        let state = match self.status {
            PlaybackStatus::Playing | PlaybackStatus::Loading => SessionPlaybackState::Playing,
            PlaybackStatus::Paused => SessionPlaybackState::Paused,
            PlaybackStatus::Idle => SessionPlaybackState::None,
        };
        session.set_playback_state(state);
    }
}
