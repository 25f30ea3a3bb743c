//! Platform Media Controls
//!
//! Lock-screen, notification and hardware-key integration. The engine
//! publishes metadata for the current track and installs one handler per
//! supported action. This is a write-only channel: nothing flows back except
//! the action callbacks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub src: String,
    /// e.g. `"192x192"`
    pub sizes: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork: Vec<Artwork>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}

impl MediaAction {
    pub const ALL: [MediaAction; 4] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::NextTrack,
        MediaAction::PreviousTrack,
    ];
}

/// Playback state shown by the OS controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPlaybackState {
    None,
    Paused,
    Playing,
}

pub type MediaActionHandler = Arc<dyn Fn(MediaAction) + Send + Sync>;

pub trait MediaSession: Send + Sync {
    fn set_metadata(&self, metadata: MediaMetadata);

    fn set_action_handler(&self, action: MediaAction, handler: MediaActionHandler);

    fn set_playback_state(&self, _state: SessionPlaybackState) {}
}

/// Media session for hosts without OS media controls.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMediaSession;

impl MediaSession for NoopMediaSession {
    fn set_metadata(&self, _metadata: MediaMetadata) {}

    fn set_action_handler(&self, _action: MediaAction, _handler: MediaActionHandler) {}
}
