//! # Prediction Scheduler
//!
//! Pure functions answering "which tracks are likely to play soon?" for the
//! resource cache to pre-fetch. Nothing here touches engine state; shuffle
//! draws take the random source as a parameter so callers (and tests) control
//! it.
//!
//! Shuffle mode never predicts a previous track: the real previous track
//! depends on play history, which queue order cannot reconstruct.

use crate::models::{PlayMode, RepeatMode, Track, TrackId};
use rand::Rng;

/// The slice of player state predictions are computed from.
#[derive(Debug, Clone, Copy)]
pub struct PredictionInput<'a> {
    pub queue: &'a [Track],
    pub index: usize,
    pub mode: PlayMode,
}

impl<'a> PredictionInput<'a> {
    pub fn new(queue: &'a [Track], index: usize, mode: PlayMode) -> Self {
        Self { queue, index, mode }
    }
}

/// Tracks likely to play after the current one, in order.
///
/// May return fewer than `count` tracks when the queue runs out without
/// `repeat = all`.
pub fn predict_next<R: Rng + ?Sized>(
    input: PredictionInput<'_>,
    count: usize,
    rng: &mut R,
) -> Vec<Track> {
    let PredictionInput { queue, index, mode } = input;
    if queue.is_empty() || count == 0 {
        return Vec::new();
    }

    if mode.repeat == RepeatMode::One {
        return queue
            .get(index)
            .map(|current| vec![current.clone(); count])
            .unwrap_or_default();
    }

    if mode.shuffle {
        predict_shuffled(queue, index, count, mode.repeat, rng)
    } else {
        predict_sequential(queue, index, count, mode.repeat)
    }
}

fn predict_sequential(
    queue: &[Track],
    index: usize,
    count: usize,
    repeat: RepeatMode,
) -> Vec<Track> {
    let mut upcoming = Vec::with_capacity(count);
    for offset in 1..=count {
        let next = index + offset;
        if next < queue.len() {
            upcoming.push(queue[next].clone());
        } else if repeat == RepeatMode::All {
            upcoming.push(queue[next % queue.len()].clone());
        } else {
            break;
        }
    }
    upcoming
}

fn predict_shuffled<R: Rng + ?Sized>(
    queue: &[Track],
    index: usize,
    count: usize,
    repeat: RepeatMode,
    rng: &mut R,
) -> Vec<Track> {
    let mut pool: Vec<&Track> = queue
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, t)| t)
        .collect();

    let mut upcoming = Vec::with_capacity(count);
    while upcoming.len() < count {
        if pool.is_empty() {
            if repeat != RepeatMode::All {
                break;
            }
            pool.extend(queue.iter());
        }
        let pick = rng.gen_range(0..pool.len());
        upcoming.push(pool.swap_remove(pick).clone());
    }
    upcoming
}

/// Tracks likely to play on "previous", nearest first. Empty under shuffle.
pub fn predict_previous(input: PredictionInput<'_>, count: usize) -> Vec<Track> {
    let PredictionInput { queue, index, mode } = input;
    if queue.is_empty() || mode.shuffle {
        return Vec::new();
    }

    let len = queue.len();
    let mut previous = Vec::with_capacity(count);
    for offset in 1..=count {
        if offset <= index {
            previous.push(queue[index - offset].clone());
        } else if mode.repeat == RepeatMode::All {
            // Wrap once past the start; further wraps would revisit tracks.
            let behind = offset - index;
            if behind > len {
                break;
            }
            previous.push(queue[len - behind].clone());
        } else {
            break;
        }
    }
    previous
}

/// Next and previous predictions combined, first occurrence of each id kept.
pub fn predict_around<R: Rng + ?Sized>(
    input: PredictionInput<'_>,
    ahead: usize,
    behind: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut combined = predict_next(input, ahead, rng);
    combined.extend(predict_previous(input, behind));

    let mut seen = Vec::with_capacity(combined.len());
    combined.retain(|track| {
        if seen.contains(&track.id) {
            false
        } else {
            seen.push(track.id);
            true
        }
    });
    combined
}

/// Whether `id` is among the tracks expected within `look_ahead` plays.
pub fn is_upcoming<R: Rng + ?Sized>(
    input: PredictionInput<'_>,
    id: TrackId,
    look_ahead: usize,
    rng: &mut R,
) -> bool {
    predict_around(input, look_ahead, 1, rng)
        .iter()
        .any(|track| track.id == id)
}
