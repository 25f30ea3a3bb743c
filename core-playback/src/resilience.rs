//! # Network Resilience Monitor
//!
//! Turns classified playback failures into recovery decisions. The monitor
//! only keeps counters and the connectivity flag; the engine carries out the
//! decision (arming a timer, reloading, skipping).
//!
//! ## Decision table
//!
//! | Failure | Condition | Decision |
//! |---------|-----------|----------|
//! | transient / aborted | offline | wait for reconnect |
//! | transient / aborted | attempts below ceiling | retry after backoff |
//! | transient / aborted | ceiling reached | treated as unplayable |
//! | unplayable | streak below threshold | skip after short delay |
//! | unplayable | streak at threshold | cooldown, streak reset |
//! | permission denied | first time for track | retry play after short delay |
//! | permission denied | again | wait for user interaction |

use crate::config::PlaybackConfig;
use crate::error::ErrorKind;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Limits and delays driving [`ResilienceMonitor`] decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_attempts: u32,
    pub max_consecutive_failures: u32,
    pub retry_backoff: Duration,
    pub skip_delay: Duration,
    pub permission_retry_delay: Duration,
}

impl RetryPolicy {
    pub fn cooldown_delay(&self) -> Duration {
        self.skip_delay * 10
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for RetryPolicy {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            max_retry_attempts: config.max_retry_attempts,
            max_consecutive_failures: config.max_consecutive_failures,
            retry_backoff: config.retry_backoff,
            skip_delay: config.skip_delay,
            permission_retry_delay: config.permission_retry_delay,
        }
    }
}

/// What the engine should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Offline: do nothing until connectivity returns.
    AwaitReconnect,
    /// Reload the active resource, restore its position and play again.
    Retry { delay: Duration, attempt: u32 },
    /// Call play again on the same resource without reloading.
    RetryPlay { delay: Duration },
    /// Move on to the next track.
    Skip { delay: Duration },
    /// Move on to the next track after a long pause.
    Cooldown { delay: Duration },
    /// Stop automatic recovery until the user acts.
    AwaitInteraction,
}

impl RecoveryDecision {
    pub fn delay(&self) -> Option<Duration> {
        match self {
            RecoveryDecision::Retry { delay, .. }
            | RecoveryDecision::RetryPlay { delay }
            | RecoveryDecision::Skip { delay }
            | RecoveryDecision::Cooldown { delay } => Some(*delay),
            RecoveryDecision::AwaitReconnect | RecoveryDecision::AwaitInteraction => None,
        }
    }

    pub fn skips(&self) -> bool {
        matches!(
            self,
            RecoveryDecision::Skip { .. } | RecoveryDecision::Cooldown { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResilienceMonitor {
    policy: RetryPolicy,
    online: bool,
    retry_attempts: u32,
    failure_streak: u32,
    permission_retried: bool,
}

impl ResilienceMonitor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            online: true,
            retry_attempts: 0,
            failure_streak: 0,
            permission_retried: false,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Record connectivity. Returns `true` on an offline → online transition.
    pub fn set_online(&mut self, online: bool) -> bool {
        let reconnected = online && !self.online;
        if online != self.online {
            info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
        self.online = online;
        reconnected
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Decide how to recover from a failure of the active track.
    pub fn on_error(&mut self, kind: ErrorKind) -> RecoveryDecision {
        let decision = match kind {
            ErrorKind::TransientNetwork | ErrorKind::AbortedBySwap => self.on_transient(),
            ErrorKind::PermissionDenied => self.on_permission_denied(),
            ErrorKind::Exhausted => RecoveryDecision::AwaitInteraction,
            ErrorKind::ResourceUnplayable | ErrorKind::Other => self.on_unplayable(),
        };
        debug!(
            "Recovery decision for {:?}: {:?} (attempts={}, streak={})",
            kind, decision, self.retry_attempts, self.failure_streak
        );
        decision
    }

    fn on_transient(&mut self) -> RecoveryDecision {
        if !self.online {
            return RecoveryDecision::AwaitReconnect;
        }

        self.retry_attempts += 1;
        if self.retry_attempts < self.policy.max_retry_attempts {
            return RecoveryDecision::Retry {
                delay: self.policy.retry_backoff,
                attempt: self.retry_attempts,
            };
        }

        warn!(
            "Retry ceiling of {} reached, giving up on track",
            self.policy.max_retry_attempts
        );
        self.on_unplayable()
    }

    fn on_unplayable(&mut self) -> RecoveryDecision {
        self.failure_streak += 1;
        if self.failure_streak >= self.policy.max_consecutive_failures {
            warn!(
                "{} unplayable tracks in a row, cooling down for {:?}",
                self.failure_streak,
                self.policy.cooldown_delay()
            );
            self.failure_streak = 0;
            return RecoveryDecision::Cooldown {
                delay: self.policy.cooldown_delay(),
            };
        }
        RecoveryDecision::Skip {
            delay: self.policy.skip_delay,
        }
    }

    fn on_permission_denied(&mut self) -> RecoveryDecision {
        if self.permission_retried {
            return RecoveryDecision::AwaitInteraction;
        }
        self.permission_retried = true;
        RecoveryDecision::RetryPlay {
            delay: self.policy.permission_retry_delay,
        }
    }

    /// The active resource is producing audio.
    pub fn on_decode_confirmed(&mut self) {
        if self.failure_streak > 0 || self.retry_attempts > 0 {
            debug!("Decode confirmed, clearing failure counters");
        }
        self.failure_streak = 0;
        self.retry_attempts = 0;
        self.permission_retried = false;
    }

    /// A different track became active.
    pub fn on_track_changed(&mut self) {
        self.retry_attempts = 0;
        self.permission_retried = false;
    }
}

impl Default for ResilienceMonitor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ResilienceMonitor {
        ResilienceMonitor::default()
    }

    #[test]
    fn transient_retries_until_ceiling() {
        let mut m = monitor();
        assert_eq!(
            m.on_error(ErrorKind::TransientNetwork),
            RecoveryDecision::Retry {
                delay: Duration::from_secs(2),
                attempt: 1
            }
        );
        assert!(matches!(
            m.on_error(ErrorKind::TransientNetwork),
            RecoveryDecision::Retry { attempt: 2, .. }
        ));
        // Third consecutive failure: no more retries for this track.
        assert_eq!(
            m.on_error(ErrorKind::TransientNetwork),
            RecoveryDecision::Skip {
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(m.failure_streak(), 1);
    }

    #[test]
    fn offline_waits_without_counting() {
        let mut m = monitor();
        m.set_online(false);
        for _ in 0..10 {
            assert_eq!(
                m.on_error(ErrorKind::TransientNetwork),
                RecoveryDecision::AwaitReconnect
            );
        }
        assert_eq!(m.retry_attempts(), 0);
        assert!(m.set_online(true));
        assert!(!m.set_online(true));
    }

    #[test]
    fn unplayable_streak_triggers_cooldown_and_resets() {
        let mut m = monitor();
        for _ in 0..14 {
            assert!(matches!(
                m.on_error(ErrorKind::ResourceUnplayable),
                RecoveryDecision::Skip { .. }
            ));
        }
        assert_eq!(
            m.on_error(ErrorKind::ResourceUnplayable),
            RecoveryDecision::Cooldown {
                delay: Duration::from_secs(10)
            }
        );
        assert_eq!(m.failure_streak(), 0);
        assert!(matches!(
            m.on_error(ErrorKind::ResourceUnplayable),
            RecoveryDecision::Skip { .. }
        ));
    }

    #[test]
    fn decode_confirmation_resets_counters() {
        let mut m = monitor();
        m.on_error(ErrorKind::TransientNetwork);
        m.on_error(ErrorKind::ResourceUnplayable);
        m.on_decode_confirmed();
        assert_eq!(m.retry_attempts(), 0);
        assert_eq!(m.failure_streak(), 0);
    }

    #[test]
    fn track_change_resets_retries_but_not_streak() {
        let mut m = monitor();
        m.on_error(ErrorKind::TransientNetwork);
        m.on_error(ErrorKind::ResourceUnplayable);
        m.on_track_changed();
        assert_eq!(m.retry_attempts(), 0);
        assert_eq!(m.failure_streak(), 1);
    }

    #[test]
    fn permission_denied_retries_once() {
        let mut m = monitor();
        assert_eq!(
            m.on_error(ErrorKind::PermissionDenied),
            RecoveryDecision::RetryPlay {
                delay: Duration::from_millis(500)
            }
        );
        assert_eq!(
            m.on_error(ErrorKind::PermissionDenied),
            RecoveryDecision::AwaitInteraction
        );
        m.on_track_changed();
        assert!(matches!(
            m.on_error(ErrorKind::PermissionDenied),
            RecoveryDecision::RetryPlay { .. }
        ));
    }

    #[test]
    fn decision_helpers() {
        assert!(RecoveryDecision::Cooldown {
            delay: Duration::from_secs(10)
        }
        .skips());
        assert_eq!(RecoveryDecision::AwaitReconnect.delay(), None);
    }
}
