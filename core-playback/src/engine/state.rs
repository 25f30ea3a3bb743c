//! Externally observable player state.

use crate::models::{RepeatMode, Track, TrackRange};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Observable playback state. Track swaps are not a state of their own; the
/// engine tracks them with an internal flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackStatus::Playing)
    }
}

/// Immutable view of the player at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub current: Option<Track>,
    pub status: PlaybackStatus,
    /// Seconds
    pub position: f64,
    /// Seconds, once known
    pub duration: Option<f64>,
    pub volume: f32,
    pub muted: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub queue_len: usize,
    pub index: usize,
    pub history_len: usize,
    pub range: Option<TrackRange>,
    pub can_play_next: bool,
    pub can_play_previous: bool,
    pub online: bool,
    pub sleep_timer_remaining: Option<Duration>,
    pub total_playtime_secs: f64,
}

impl PlayerSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    /// Position as a percentage of the duration; 0 while the duration is
    /// unknown.
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                (self.position / duration * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        }
    }

    pub fn formatted_position(&self) -> String {
        format_time(self.position)
    }

    pub fn formatted_duration(&self) -> String {
        format_time(self.duration.unwrap_or(0.0))
    }
}

/// `m:ss`. Negative or non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn progress_requires_duration() {
        let mut snapshot = PlayerSnapshot {
            current: None,
            status: PlaybackStatus::Playing,
            position: 30.0,
            duration: None,
            volume: 0.8,
            muted: false,
            shuffle: false,
            repeat: RepeatMode::None,
            queue_len: 0,
            index: 0,
            history_len: 0,
            range: None,
            can_play_next: false,
            can_play_previous: false,
            online: true,
            sleep_timer_remaining: None,
            total_playtime_secs: 0.0,
        };
        assert_eq!(snapshot.progress(), 0.0);

        snapshot.duration = Some(120.0);
        assert_eq!(snapshot.progress(), 25.0);
        assert_eq!(snapshot.formatted_duration(), "2:00");
        assert!(snapshot.is_playing());
    }
}
