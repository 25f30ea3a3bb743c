//! Everything that can wake the engine loop.
//!
//! Resource callbacks, timer firings, host signals and commands all funnel
//! into one unbounded queue as [`EngineEvent`]s, so the engine mutates its
//! state from exactly one place.

use crate::engine::state::PlayerSnapshot;
use crate::listeners::InstanceId;
use crate::models::{RepeatMode, Track, TrackId, TrackRange};
use bridge_traits::{LifecycleState, ResourceEvent};
use core_async::sync::{mpsc, oneshot};
use std::time::Duration;

pub(crate) type EventSender = mpsc::UnboundedSender<EngineEvent>;

#[derive(Debug)]
pub enum EngineEvent {
    /// Event from the resource bound under `instance`.
    Resource {
        instance: InstanceId,
        event: ResourceEvent,
    },
    Timer(TimerKind),
    Command(Command),
    Connectivity { online: bool },
    Lifecycle(LifecycleState),
    TitleResolved { track_id: TrackId, title: String },
}

/// What to do when a recovery delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Reload the active resource and resume from the last position.
    Reload,
    /// Request playback again without reloading.
    RetryPlay,
    /// Move on to the next eligible track.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Stall(InstanceId),
    EndFallback(InstanceId),
    Recovery(InstanceId, RecoveryAction),
    SleepTimer,
    Persist,
}

/// User-level commands, as sent by [`EngineHandle`](crate::EngineHandle)
/// and the media session.
#[derive(Debug)]
pub enum Command {
    PlayTrack {
        track_id: TrackId,
        queue: Option<Vec<Track>>,
        index: Option<usize>,
    },
    Next,
    Previous,
    Play,
    Pause,
    TogglePlay,
    Seek(f64),
    SetVolume(f32),
    ToggleMute,
    ToggleShuffle,
    SetShuffle(bool),
    CycleRepeat,
    SetRepeat(RepeatMode),
    SetRange(Option<TrackRange>),
    SetSleepTimer(Option<Duration>),
    Snapshot(oneshot::Sender<PlayerSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Closure for a `TimerSlot` that posts `kind` back into the queue.
pub(crate) fn post_timer(tx: &EventSender, kind: TimerKind) -> impl FnOnce() + Send + 'static {
    let tx = tx.clone();
    move || {
        let _ = tx.send(EngineEvent::Timer(kind));
    }
}
