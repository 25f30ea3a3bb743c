//! Cloneable command handle for a running [`PlaybackEngine`].
//!
//! [`PlaybackEngine`]: crate::PlaybackEngine

use crate::engine::{Command, EngineEvent, PlayerSnapshot};
use crate::error::{PlaybackError, Result};
use crate::models::{RepeatMode, Track, TrackId, TrackRange};
use bridge_traits::LifecycleState;
use core_async::sync::{mpsc, oneshot};
use std::time::Duration;

/// Sends commands to the engine loop. Every method only enqueues; the
/// engine applies commands in the order they were sent.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: EngineEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| PlaybackError::EngineStopped)
    }

    fn command(&self, command: Command) -> Result<()> {
        self.send(EngineEvent::Command(command))
    }

    pub fn play_track(
        &self,
        track_id: TrackId,
        queue: Option<Vec<Track>>,
        index: Option<usize>,
    ) -> Result<()> {
        self.command(Command::PlayTrack {
            track_id,
            queue,
            index,
        })
    }

    pub fn next(&self) -> Result<()> {
        self.command(Command::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.command(Command::Previous)
    }

    pub fn play(&self) -> Result<()> {
        self.command(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.command(Command::Pause)
    }

    pub fn toggle_play(&self) -> Result<()> {
        self.command(Command::TogglePlay)
    }

    pub fn seek(&self, position: f64) -> Result<()> {
        self.command(Command::Seek(position))
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.command(Command::SetVolume(volume))
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.command(Command::ToggleMute)
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.command(Command::ToggleShuffle)
    }

    pub fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        self.command(Command::SetShuffle(shuffle))
    }

    pub fn cycle_repeat(&self) -> Result<()> {
        self.command(Command::CycleRepeat)
    }

    pub fn set_repeat(&self, repeat: RepeatMode) -> Result<()> {
        self.command(Command::SetRepeat(repeat))
    }

    pub fn set_range(&self, range: Option<TrackRange>) -> Result<()> {
        self.command(Command::SetRange(range))
    }

    pub fn set_sleep_timer(&self, duration: Option<Duration>) -> Result<()> {
        self.command(Command::SetSleepTimer(duration))
    }

    /// Forward a connectivity change from a host without a `NetworkMonitor`.
    pub fn notify_connectivity(&self, online: bool) -> Result<()> {
        self.send(EngineEvent::Connectivity { online })
    }

    /// Forward a lifecycle change from a host without a `LifecycleObserver`.
    pub fn notify_lifecycle(&self, state: LifecycleState) -> Result<()> {
        self.send(EngineEvent::Lifecycle(state))
    }

    /// Current player state, once the engine gets to the request.
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (reply, response) = oneshot::channel();
        self.command(Command::Snapshot(reply))?;
        response.await.map_err(|_| PlaybackError::EngineStopped)
    }

    /// Stop the engine loop, flushing the session first.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.command(Command::Shutdown(reply))?;
        response.await.map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_arrive_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = EngineHandle::new(tx);

        handle.next().unwrap();
        handle.seek(12.5).unwrap();
        handle.notify_connectivity(false).unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(EngineEvent::Command(Command::Next))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(EngineEvent::Command(Command::Seek(p))) if p == 12.5
        ));
        assert!(matches!(
            rx.recv().await,
            Some(EngineEvent::Connectivity { online: false })
        ));
    }

    #[tokio::test]
    async fn stopped_engine_is_reported() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = EngineHandle::new(tx);
        drop(rx);

        assert!(handle.is_closed());
        assert!(matches!(handle.pause(), Err(PlaybackError::EngineStopped)));
        assert!(matches!(
            handle.snapshot().await,
            Err(PlaybackError::EngineStopped)
        ));
    }
}
