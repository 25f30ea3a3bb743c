//! Track swaps: play, next, previous, end of track.

use super::events::EngineEvent;
use super::{ActiveResource, PlaybackEngine, PlaybackStatus};
use crate::error::PlaybackError;
use crate::listeners::ListenerRegistration;
use crate::models::{RepeatMode, Track, TrackId};
use crate::prediction::{predict_around, PredictionInput};
use bridge_traits::{MediaResource, ResourceError};
use core_async::time::timeout;
use core_runtime::events::PlaybackEvent;
use core_runtime::logging::strip_path;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How a swap was requested. Going back replays from history without
/// recording the departing track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Navigation {
    Direct,
    Forward,
    Back,
}

impl PlaybackEngine {
    /// Start playing `track_id`, optionally replacing the queue first.
    ///
    /// `index` selects the queue position when the track appears more than
    /// once. Returns `false` when the track is unknown or a swap is already
    /// in flight. Playback failures are recovered internally.
    #[instrument(skip(self, queue))]
    pub async fn play_track(
        &mut self,
        track_id: TrackId,
        queue: Option<Vec<Track>>,
        index: Option<usize>,
    ) -> bool {
        if self.transitioning {
            warn!("Swap already in flight, ignoring play request");
            return false;
        }

        // Resolve against the candidate queue; nothing changes on rejection.
        let tracks = queue.as_deref().unwrap_or(self.queue.tracks());
        let position = index
            .filter(|&i| tracks.get(i).is_some_and(|t| t.id == track_id))
            .or_else(|| tracks.iter().position(|t| t.id == track_id));
        let Some((position, track)) =
            position.and_then(|i| tracks.get(i).cloned().map(|track| (i, track)))
        else {
            warn!("Track {} is not in the queue", track_id);
            return false;
        };

        if let Some(tracks) = queue {
            self.queue.replace(tracks);
        }

        self.transition_to(track, Some(position), Navigation::Direct)
            .await
    }

    /// Move to the next track according to the play mode.
    ///
    /// No-op unless shuffle is on, repeat is `all`, or a later track exists.
    /// Under `repeat = one` the current track restarts.
    pub async fn advance_next(&mut self) -> bool {
        if self.transitioning || !self.can_play_next() {
            return false;
        }
        if self.mode.repeat == RepeatMode::One && self.active.is_some() {
            return self.restart_current().await;
        }
        self.skip_forward().await
    }

    /// Move to the next eligible track ignoring `repeat = one`.
    pub(super) async fn skip_forward(&mut self) -> bool {
        let Some(index) = self.next_index() else {
            debug!("No eligible next track");
            return false;
        };
        let Some(track) = self.queue.get(index).cloned() else {
            return false;
        };
        self.transition_to(track, Some(index), Navigation::Forward)
            .await
    }

    /// Replay the most recent history entry.
    pub async fn advance_previous(&mut self) -> bool {
        if self.transitioning {
            return false;
        }
        let Some(track) = self.history.pop() else {
            return false;
        };
        let index = self.queue.position_of(track.id);
        self.transition_to(track, index, Navigation::Back).await
    }

    /// Next queue index for the current mode and range filter.
    pub(super) fn next_index(&mut self) -> Option<usize> {
        let len = self.queue.len();
        if len == 0 {
            return None;
        }
        let range = self.range;
        let eligible = |id: TrackId| range.map_or(true, |r| r.contains(id));

        if self.mode.shuffle {
            let candidates: Vec<usize> = self
                .queue
                .tracks()
                .iter()
                .enumerate()
                .filter(|(_, track)| eligible(track.id))
                .map(|(i, _)| i)
                .collect();
            if candidates.is_empty() {
                return None;
            }
            return Some(candidates[self.rng.gen_range(0..candidates.len())]);
        }

        let current = self.queue.index();
        for step in 1..=len {
            let mut index = current + step;
            if index >= len {
                if self.mode.repeat != RepeatMode::All {
                    return None;
                }
                index %= len;
            }
            if self.queue.get(index).is_some_and(|track| eligible(track.id)) {
                return Some(index);
            }
        }
        None
    }

    /// Bind `track` as the active track and start it.
    #[instrument(skip(self, track), fields(track = %track.id))]
    pub(super) async fn transition_to(
        &mut self,
        track: Track,
        index: Option<usize>,
        navigation: Navigation,
    ) -> bool {
        if self.transitioning {
            return false;
        }
        self.transitioning = true;

        let previous = self.current.clone();
        let same_track = previous.as_ref().map(|t| t.id) == Some(track.id);
        if let Some(previous) = previous {
            if !same_track && navigation != Navigation::Back {
                self.history.push(previous);
            }
        }
        if !same_track {
            self.resilience.on_track_changed();
        }
        if let Some(index) = index {
            self.queue.set_index(index);
        }

        self.disarm_track_timers();
        self.current = Some(track.clone());
        self.end_handled = false;
        self.last_position = None;
        self.last_reported_second = None;

        let (resource, from_cache) = match self.cache.claim_ready(track.id) {
            Some(resource) => {
                debug!("Using pre-fetched resource for track {}", track.id);
                (resource, true)
            }
            None => {
                let locator = self.resolver.resolve(track.id);
                debug!("Loading track {} from {}", track.id, strip_path(&locator));
                (self.factory.create(&locator), false)
            }
        };

        let outgoing = self.active.take();
        resource.set_volume(self.volume);
        resource.set_muted(self.muted);
        // Advancing always starts from the top, even when the draw lands on
        // the same track.
        if from_cache && same_track && navigation == Navigation::Direct {
            if let Some(outgoing) = &outgoing {
                let position = outgoing.resource.snapshot().position;
                if position > 0.0 {
                    resource.seek(position);
                }
            }
        }
        if let Some(outgoing) = outgoing {
            Self::retire(outgoing);
        }
        self.bind(track.id, resource.clone());

        self.status = PlaybackStatus::Loading;
        self.intent_playing = true;
        info!("Now playing track {}: {}", track.id, track.title);
        self.emit(PlaybackEvent::TrackChanged {
            track_id: track.id.0,
            title: track.title.clone(),
            index: self.queue.index(),
        });
        self.publish_media_session();

        let result = self.start_playback(&resource).await;
        self.transitioning = false;

        match result {
            Ok(()) => {
                self.status = PlaybackStatus::Playing;
                self.emit(PlaybackEvent::Started {
                    track_id: track.id.0,
                    title: track.title.clone(),
                });
                self.sync_session_state();
            }
            Err(error) => {
                warn!("Could not start track {}: {}", track.id, error);
                self.handle_failure(error);
            }
        }

        self.schedule_prefetch();
        self.refine_title_in_background(&track);
        true
    }

    /// Request playback, retrying once if the request raced with the swap.
    pub(super) async fn start_playback(
        &self,
        resource: &Arc<dyn MediaResource>,
    ) -> Result<(), PlaybackError> {
        match resource.play().await {
            Ok(()) => Ok(()),
            Err(ResourceError::Aborted(reason)) => {
                debug!("Play request aborted ({}), waiting for ready", reason);
                match timeout(self.config.ready_timeout, resource.wait_ready()).await {
                    Ok(Ok(())) => resource.play().await.map_err(PlaybackError::from),
                    Ok(Err(e)) => Err(e.into()),
                    Err(_) => Err(PlaybackError::AbortedBySwap(format!(
                        "not ready within {:?}",
                        self.config.ready_timeout
                    ))),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Attach a fresh registration to `resource` and make it active.
    pub(super) fn bind(&mut self, track_id: TrackId, resource: Arc<dyn MediaResource>) {
        self.next_instance += 1;
        let registration = ListenerRegistration::new(self.next_instance);
        let tx = self.tx.clone();
        resource.attach(registration.sink(move |instance, event| {
            let _ = tx.send(EngineEvent::Resource { instance, event });
        }));
        self.active = Some(ActiveResource {
            track_id,
            resource,
            registration,
        });
    }

    /// Revoke, detach, stop and free a resource leaving the active role.
    pub(super) fn retire(outgoing: ActiveResource) {
        debug!(
            "Retiring resource {} (track {})",
            outgoing.resource.id(),
            outgoing.track_id
        );
        outgoing.registration.revoke();
        outgoing.resource.detach();
        outgoing.resource.pause();
        outgoing.resource.release();
    }

    /// Seek the active resource to the start and play it again.
    ///
    /// The resource is rebound under a new instance, so completion signals
    /// still queued from the previous play-through are dropped as stale.
    pub(super) async fn restart_current(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        debug!("Restarting current track");
        active.registration.revoke();
        active.resource.detach();
        let resource = active.resource.clone();
        self.bind(active.track_id, active.resource);
        self.disarm_track_timers();
        self.end_handled = false;
        self.last_position = None;
        self.last_reported_second = None;
        self.intent_playing = true;
        resource.seek(0.0);
        match self.start_playback(&resource).await {
            Ok(()) => {
                self.status = PlaybackStatus::Playing;
                if let Some(track) = &self.current {
                    self.emit(PlaybackEvent::Started {
                        track_id: track.id.0,
                        title: track.title.clone(),
                    });
                }
            }
            Err(error) => self.handle_failure(error),
        }
        true
    }

    /// Complete the active track. Runs at most once per bound instance, no
    /// matter how many completion signals arrive.
    pub async fn handle_end_of_track(&mut self) -> bool {
        if self.end_handled || self.active.is_none() || self.transitioning {
            debug!("End of track already handled");
            return false;
        }
        self.end_handled = true;
        self.end_timer.disarm();
        self.stall_timer.disarm();

        if let Some(id) = self.current_id() {
            self.emit(PlaybackEvent::Completed { track_id: id.0 });
        }

        if self.mode.repeat == RepeatMode::One {
            return self.restart_current().await;
        }
        if self.advance_next().await {
            return true;
        }

        info!("Reached the end of the queue");
        self.intent_playing = false;
        self.status = PlaybackStatus::Paused;
        if let Some(id) = self.current_id() {
            self.emit(PlaybackEvent::Paused {
                track_id: id.0,
                position_ms: self.position_ms(),
            });
        }
        self.sync_session_state();
        false
    }

    /// Pre-fetch the predicted neighbours of the current position.
    pub(super) fn schedule_prefetch(&mut self) {
        let active = self.current_id();
        let range = self.range;
        let input = PredictionInput::new(self.queue.tracks(), self.queue.index(), self.mode);
        let upcoming: Vec<Track> = predict_around(
            input,
            self.config.preload_ahead,
            self.config.preload_behind,
            &mut self.rng,
        )
        .into_iter()
        .filter(|track| Some(track.id) != active)
        .filter(|track| range.map_or(true, |r| r.contains(track.id)))
        .collect();

        if upcoming.is_empty() {
            return;
        }
        debug!(
            "Scheduling pre-fetch of {:?}",
            upcoming.iter().map(|t| t.id.0).collect::<Vec<_>>()
        );
        let cache = self.cache.clone();
        core_async::spawn(async move { cache.preload(upcoming).await });
    }

    /// Ask the catalog for a real title without blocking playback.
    pub(super) fn refine_title_in_background(&self, track: &Track) {
        if !track.has_placeholder_title() {
            return;
        }
        let Some(catalog) = self.catalog.clone() else {
            return;
        };
        let tx = self.tx.clone();
        let track_id = track.id;
        core_async::spawn(async move {
            match catalog.title(track_id).await {
                Ok(Some(title)) => {
                    let _ = tx.send(EngineEvent::TitleResolved { track_id, title });
                }
                Ok(None) => debug!("Catalog has no title for track {}", track_id),
                Err(e) => warn!("Title lookup for track {} failed: {}", track_id, e),
            }
        });
    }

    /// Apply a refined title everywhere the track appears.
    pub(super) fn apply_title(&mut self, track_id: TrackId, title: &str) {
        let in_queue = self.queue.update_title(track_id, title);
        let in_history = self.history.refine_title(track_id, title);
        let is_current = match self.current.as_mut() {
            Some(track) if track.id == track_id => track.refine_title(title),
            _ => false,
        };

        if !(in_queue || in_history || is_current) {
            return;
        }
        debug!("Refined title of track {} to {:?}", track_id, title);
        self.emit(PlaybackEvent::TitleRefined {
            track_id: track_id.0,
            title: title.to_string(),
        });
        if is_current {
            self.publish_media_session();
        }
    }
}
