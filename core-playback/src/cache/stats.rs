//! Cache statistics

use serde::{Deserialize, Serialize};

/// Point-in-time counts of cache entries by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in any status
    pub total: usize,

    /// Entries ready to be claimed
    pub ready: usize,

    /// Pre-fetches still in flight
    pub loading: usize,

    /// Pre-fetches that failed
    pub errored: usize,

    /// Configured capacity
    pub max_size: usize,
}

impl CacheStats {
    /// Cache usage as a percentage of capacity.
    pub fn usage_percentage(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }

        (self.total as f64 / self.max_size as f64) * 100.0
    }

    /// Returns true if admitting another entry requires eviction.
    pub fn is_full(&self) -> bool {
        self.total >= self.max_size
    }

    /// Fraction of entries that can be claimed (0.0 when empty).
    pub fn ready_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        self.ready as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_and_ratio() {
        let stats = CacheStats {
            total: 4,
            ready: 3,
            loading: 1,
            errored: 0,
            max_size: 8,
        };
        assert_eq!(stats.usage_percentage(), 50.0);
        assert_eq!(stats.ready_ratio(), 0.75);
        assert!(!stats.is_full());
    }

    #[test]
    fn test_empty_stats() {
        let stats = CacheStats::default();
        assert_eq!(stats.usage_percentage(), 0.0);
        assert_eq!(stats.ready_ratio(), 0.0);
    }
}
