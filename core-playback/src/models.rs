//! Track, queue and play-mode types owned by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric identity of a track in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl TrackId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// File name the catalog stores this track under.
    pub fn file_name(&self) -> String {
        format!("link.{}.mp3", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrackId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A playable audio item.
///
/// Only the title ever changes after construction, and only from the
/// placeholder to a real title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub filename: String,
    /// Duration in seconds, when the catalog knows it
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl Track {
    /// Track with the placeholder title and the catalog file name.
    pub fn new(id: impl Into<TrackId>) -> Self {
        let id = id.into();
        Self {
            id,
            title: Self::placeholder_title(id),
            filename: id.file_name(),
            duration: None,
            is_favorite: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn placeholder_title(id: TrackId) -> String {
        format!("Track {}", id)
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title.is_empty() || self.title == Self::placeholder_title(self.id)
    }

    /// Replace the title if `title` is a real one. Returns `true` on change.
    pub fn refine_title(&mut self, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() || title == Self::placeholder_title(self.id) || title == self.title {
            return false;
        }
        self.title = title.to_string();
        true
    }
}

/// Repeat behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    None,
    All,
    One,
}

impl RepeatMode {
    /// none → all → one → none
    pub fn next(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayMode {
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

impl PlayMode {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn shuffled() -> Self {
        Self {
            shuffle: true,
            repeat: RepeatMode::None,
        }
    }

    pub fn with_repeat(mut self, repeat: RepeatMode) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Closed range of track ids playback is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRange {
    pub start: u32,
    pub end: u32,
}

impl TrackRange {
    /// Bounds are swapped if given in reverse.
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn contains(&self, id: TrackId) -> bool {
        (self.start..=self.end).contains(&id.0)
    }
}

/// Ordered working set plus a cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    tracks: Vec<Track>,
    index: usize,
}

impl Queue {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks, index: 0 }
    }

    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.index = 0;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.index)
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Move the cursor. Out-of-range indices are ignored.
    pub fn set_index(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.index = index;
            true
        } else {
            false
        }
    }

    pub fn update_title(&mut self, id: TrackId, title: &str) -> bool {
        let mut changed = false;
        for track in self.tracks.iter_mut().filter(|t| t.id == id) {
            changed |= track.refine_title(title);
        }
        changed
    }
}
