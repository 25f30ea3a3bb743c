//! # Playback Configuration
//!
//! Limits and delays for the engine, the resource cache and the resilience
//! monitor. Every field has a serde default so partial JSON configurations
//! deserialize cleanly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Maximum number of pre-fetched resources kept by the cache.
    ///
    /// Default: 50.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Tracks predicted ahead of the current one for pre-fetch.
    ///
    /// Default: 2.
    #[serde(default = "default_preload_ahead")]
    pub preload_ahead: usize,

    /// Tracks predicted behind the current one for pre-fetch.
    ///
    /// Default: 1.
    #[serde(default = "default_preload_behind")]
    pub preload_behind: usize,

    /// Play history capacity in sequential mode.
    ///
    /// Default: 50.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Play history capacity while shuffle is on.
    ///
    /// Default: 1.
    #[serde(default = "default_shuffle_history_capacity")]
    pub shuffle_history_capacity: usize,

    /// Attempts allowed for one track on transient network failures.
    ///
    /// Default: 3.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Unplayable tracks in a row before a cooldown is imposed.
    ///
    /// Default: 15.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Delay before retrying after a transient network failure.
    ///
    /// Default: 2 seconds.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: Duration,

    /// Delay before skipping an unplayable track. The cooldown is ten times
    /// this value.
    ///
    /// Default: 1 second.
    #[serde(default = "default_skip_delay")]
    pub skip_delay: Duration,

    /// Delay before the single retry after the platform refused playback.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_permission_retry_delay")]
    pub permission_retry_delay: Duration,

    /// Debounce before a stall triggers a retry.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout: Duration,

    /// Bound on waiting for readiness after a play request was aborted.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout: Duration,

    /// Bound on a single pre-fetch.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_preload_timeout")]
    pub preload_timeout: Duration,

    /// Distance from the end at which a track counts as finished.
    ///
    /// Default: 1 second.
    #[serde(default = "default_end_proximity")]
    pub end_proximity: Duration,

    /// Extra wait past the expected end before the fallback completes the
    /// track.
    ///
    /// Default: 1.5 seconds.
    #[serde(default = "default_end_fallback_grace")]
    pub end_fallback_grace: Duration,

    /// Minimum spacing between writes of the persisted session.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_persist_interval")]
    pub persist_interval: Duration,

    /// Sleep timer applied on first launch. `None` disables it.
    ///
    /// Default: 60 minutes.
    #[serde(default = "default_sleep_timer")]
    pub default_sleep_timer: Option<Duration>,

    /// Initial output volume in `[0, 1]`.
    ///
    /// Default: 0.8.
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Artwork published to the media session.
    #[serde(default)]
    pub artwork_url: Option<String>,
}

fn default_max_cache_size() -> usize {
    50
}

fn default_preload_ahead() -> usize {
    2
}

fn default_preload_behind() -> usize {
    1
}

fn default_history_capacity() -> usize {
    50
}

fn default_shuffle_history_capacity() -> usize {
    1
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_max_consecutive_failures() -> u32 {
    15
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_skip_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_permission_retry_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_preload_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_end_proximity() -> Duration {
    Duration::from_secs(1)
}

fn default_end_fallback_grace() -> Duration {
    Duration::from_millis(1500)
}

fn default_persist_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_sleep_timer() -> Option<Duration> {
    Some(Duration::from_secs(60 * 60))
}

fn default_volume() -> f32 {
    0.8
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_cache_size: default_max_cache_size(),
            preload_ahead: default_preload_ahead(),
            preload_behind: default_preload_behind(),
            history_capacity: default_history_capacity(),
            shuffle_history_capacity: default_shuffle_history_capacity(),
            max_retry_attempts: default_max_retry_attempts(),
            max_consecutive_failures: default_max_consecutive_failures(),
            retry_backoff: default_retry_backoff(),
            skip_delay: default_skip_delay(),
            permission_retry_delay: default_permission_retry_delay(),
            stall_timeout: default_stall_timeout(),
            ready_timeout: default_ready_timeout(),
            preload_timeout: default_preload_timeout(),
            end_proximity: default_end_proximity(),
            end_fallback_grace: default_end_fallback_grace(),
            persist_interval: default_persist_interval(),
            default_sleep_timer: default_sleep_timer(),
            default_volume: default_volume(),
            artwork_url: None,
        }
    }
}

impl PlaybackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_cache_size(mut self, size: usize) -> Self {
        self.max_cache_size = size;
        self
    }

    pub fn with_preload_window(mut self, ahead: usize, behind: usize) -> Self {
        self.preload_ahead = ahead;
        self.preload_behind = behind;
        self
    }

    pub fn with_history_capacity(mut self, sequential: usize, shuffle: usize) -> Self {
        self.history_capacity = sequential;
        self.shuffle_history_capacity = shuffle;
        self
    }

    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    pub fn with_retry_backoff(mut self, delay: Duration) -> Self {
        self.retry_backoff = delay;
        self
    }

    pub fn with_skip_delay(mut self, delay: Duration) -> Self {
        self.skip_delay = delay;
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn with_persist_interval(mut self, interval: Duration) -> Self {
        self.persist_interval = interval;
        self
    }

    pub fn with_default_sleep_timer(mut self, timer: Option<Duration>) -> Self {
        self.default_sleep_timer = timer;
        self
    }

    pub fn with_default_volume(mut self, volume: f32) -> Self {
        self.default_volume = volume;
        self
    }

    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    /// Delay imposed after a run of unplayable tracks.
    pub fn cooldown_delay(&self) -> Duration {
        self.skip_delay * 10
    }

    pub fn history_capacity_for(&self, shuffle: bool) -> usize {
        if shuffle {
            self.shuffle_history_capacity
        } else {
            self.history_capacity
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cache_size == 0 {
            return Err("max_cache_size must be > 0".to_string());
        }

        if self.history_capacity == 0 || self.shuffle_history_capacity == 0 {
            return Err("history capacities must be > 0".to_string());
        }

        if self.max_retry_attempts == 0 {
            return Err("max_retry_attempts must be > 0".to_string());
        }

        if self.max_consecutive_failures == 0 {
            return Err("max_consecutive_failures must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err("default_volume must be between 0.0 and 1.0".to_string());
        }

        if self.persist_interval.is_zero() {
            return Err("persist_interval must be > 0".to_string());
        }

        Ok(())
    }
}
