//! Cache configuration

use crate::config::PlaybackConfig;
use std::time::Duration;

/// Number of slots the eviction pass may free beyond the one being admitted.
pub const EVICTION_HEADROOM: usize = 5;

/// Configuration for the [`ResourceCache`](super::ResourceCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (default: 50)
    pub max_size: usize,

    /// Bound on waiting for one pre-fetch to become ready (default: 30s)
    pub preload_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 50,
            preload_timeout: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, entries: usize) -> Self {
        self.max_size = entries;
        self
    }

    pub fn with_preload_timeout(mut self, timeout: Duration) -> Self {
        self.preload_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_size == 0 {
            return Err("max_size must be > 0".to_string());
        }
        if self.preload_timeout.is_zero() {
            return Err("preload_timeout must be > 0".to_string());
        }
        Ok(())
    }
}

impl From<&PlaybackConfig> for CacheConfig {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            max_size: config.max_cache_size,
            preload_timeout: config.preload_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_playback_config() {
        let config = CacheConfig::from(&PlaybackConfig::default().with_max_cache_size(7));
        assert_eq!(config.max_size, 7);
        assert_eq!(config.preload_timeout, Duration::from_secs(30));
        assert!(CacheConfig::new().with_max_size(0).validate().is_err());
    }
}
