//! Bounded stack of previously active tracks.
//!
//! Backs "previous" navigation: the stack records what actually played, not
//! what precedes the cursor in the queue.

use crate::models::{Track, TrackId};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct PlayHistory {
    entries: VecDeque<Track>,
    capacity: usize,
}

impl PlayHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Push the most recent track, dropping the oldest beyond capacity.
    pub fn push(&mut self, track: Track) {
        self.entries.push_back(track);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Most recent track, removed.
    pub fn pop(&mut self) -> Option<Track> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&Track> {
        self.entries.back()
    }

    /// Re-bound the stack, keeping the most recent entries.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn refine_title(&mut self, id: TrackId, title: &str) -> bool {
        let mut changed = false;
        for track in self.entries.iter_mut().filter(|t| t.id == id) {
            changed |= track.refine_title(title);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_to_capacity() {
        let mut history = PlayHistory::new(50);
        for id in 0..80 {
            history.push(Track::new(id));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.peek().map(|t| t.id), Some(TrackId(79)));
    }

    #[test]
    fn shrinking_keeps_most_recent() {
        let mut history = PlayHistory::new(50);
        for id in 0..5 {
            history.push(Track::new(id));
        }
        history.set_capacity(1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.pop().map(|t| t.id), Some(TrackId(4)));
        assert!(history.pop().is_none());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut history = PlayHistory::new(0);
        history.push(Track::new(1));
        history.push(Track::new(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }
}
