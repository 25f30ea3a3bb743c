//! Persisted listening session.
//!
//! Three values survive restarts: the total playtime accumulator, the sleep
//! timer and the range filter. The sleep timer is stored as a remaining
//! duration plus the wall-clock time it was saved at, so time spent while the
//! process was suspended still counts down.

use crate::error::Result;
use crate::models::TrackRange;
use bridge_traits::{Clock, SettingsStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const PLAYTIME_KEY: &str = "playback.total_playtime";
pub const SLEEP_TIMER_KEY: &str = "playback.sleep_timer";
pub const RANGE_KEY: &str = "playback.range";
pub const INITIALIZED_KEY: &str = "playback.initialized";

/// Sleep timer as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepTimerState {
    pub remaining_ms: u64,
    pub saved_at_ms: i64,
}

impl SleepTimerState {
    pub fn new(remaining: Duration, saved_at_ms: i64) -> Self {
        Self {
            remaining_ms: remaining.as_millis().min(u64::MAX as u128) as u64,
            saved_at_ms,
        }
    }

    /// Time left at wall-clock `now_ms`. A clock that went backwards does not
    /// extend the timer.
    pub fn remaining_at(&self, now_ms: i64) -> Duration {
        let elapsed = now_ms.saturating_sub(self.saved_at_ms).max(0) as u64;
        Duration::from_millis(self.remaining_ms.saturating_sub(elapsed))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSession {
    pub total_playtime_secs: f64,
    pub sleep_timer: Option<SleepTimerState>,
    pub range: Option<TrackRange>,
    /// No session had ever been saved before this load.
    pub first_run: bool,
}

impl PersistedSession {
    /// Sleep time left at `now_ms`, `None` if unset or already expired.
    pub fn sleep_remaining(&self, now_ms: i64) -> Option<Duration> {
        self.sleep_timer
            .map(|timer| timer.remaining_at(now_ms))
            .filter(|remaining| !remaining.is_zero())
    }
}

/// Reads and writes [`PersistedSession`] through a [`SettingsStore`].
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.unix_timestamp_millis()
    }

    /// Restore the session. First-time users get `default_sleep_timer`.
    pub async fn load(&self, default_sleep_timer: Option<Duration>) -> Result<PersistedSession> {
        let first_run = !self.store.has_key(INITIALIZED_KEY).await?;
        let now = self.now_millis();

        let total_playtime_secs = self
            .store
            .get_f64(PLAYTIME_KEY)
            .await?
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .unwrap_or(0.0);
        let range = self.get_value::<TrackRange>(RANGE_KEY).await?;

        let sleep_timer = if first_run {
            default_sleep_timer.map(|remaining| SleepTimerState::new(remaining, now))
        } else {
            self.get_value::<SleepTimerState>(SLEEP_TIMER_KEY)
                .await?
                .filter(|timer| {
                    let alive = !timer.remaining_at(now).is_zero();
                    if !alive {
                        debug!("Persisted sleep timer expired while away");
                    }
                    alive
                })
        };

        if first_run {
            self.store.set_bool(INITIALIZED_KEY, true).await?;
        }

        Ok(PersistedSession {
            total_playtime_secs,
            sleep_timer,
            range,
            first_run,
        })
    }

    pub async fn save(&self, session: &PersistedSession) -> Result<()> {
        self.store
            .set_f64(PLAYTIME_KEY, session.total_playtime_secs)
            .await?;
        self.put_value(SLEEP_TIMER_KEY, session.sleep_timer.as_ref())
            .await?;
        self.put_value(RANGE_KEY, session.range.as_ref()).await?;
        self.store.set_bool(INITIALIZED_KEY, true).await?;
        debug!(
            "Session saved (playtime={:.0}s, sleep_timer={}, range={:?})",
            session.total_playtime_secs,
            session.sleep_timer.is_some(),
            session.range
        );
        Ok(())
    }

    async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.store.get_json(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!("Ignoring malformed persisted value for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn put_value<T: Serialize>(&self, key: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => {
                let json = serde_json::to_value(value)
                    .map_err(bridge_traits::BridgeError::from)?;
                self.store.set_json(key, &json).await?;
            }
            None => self.store.delete(key).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{ManualClock, MemorySettingsStore};

    fn session_store() -> (Arc<MemorySettingsStore>, Arc<ManualClock>, SessionStore) {
        let store = Arc::new(MemorySettingsStore::new());
        let clock = Arc::new(ManualClock::at_millis(1_000_000));
        let sessions = SessionStore::new(store.clone(), clock.clone());
        (store, clock, sessions)
    }

    #[tokio::test]
    async fn first_run_gets_default_sleep_timer() {
        let (_, _, sessions) = session_store();
        let session = sessions
            .load(Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(session.first_run);
        assert_eq!(
            session.sleep_remaining(1_000_000),
            Some(Duration::from_secs(3600))
        );

        let again = sessions
            .load(Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(!again.first_run);
        assert!(again.sleep_timer.is_none());
    }

    #[tokio::test]
    async fn sleep_timer_counts_down_while_away() {
        let (_, clock, sessions) = session_store();
        sessions.load(None).await.unwrap();

        let session = PersistedSession {
            total_playtime_secs: 125.5,
            sleep_timer: Some(SleepTimerState::new(Duration::from_secs(600), 1_000_000)),
            range: Some(TrackRange::new(10, 20)),
            first_run: false,
        };
        sessions.save(&session).await.unwrap();

        clock.advance(Duration::from_secs(200));
        let restored = sessions.load(None).await.unwrap();
        assert_eq!(restored.total_playtime_secs, 125.5);
        assert_eq!(restored.range, Some(TrackRange::new(10, 20)));
        assert_eq!(
            restored.sleep_remaining(sessions.now_millis()),
            Some(Duration::from_secs(400))
        );
    }

    #[tokio::test]
    async fn expired_sleep_timer_is_dropped() {
        let (_, clock, sessions) = session_store();
        sessions.load(None).await.unwrap();
        sessions
            .save(&PersistedSession {
                sleep_timer: Some(SleepTimerState::new(Duration::from_secs(60), 1_000_000)),
                ..PersistedSession::default()
            })
            .await
            .unwrap();

        clock.advance(Duration::from_secs(61));
        assert!(sessions.load(None).await.unwrap().sleep_timer.is_none());
    }

    #[tokio::test]
    async fn cleared_values_are_deleted() {
        let (store, _, sessions) = session_store();
        sessions
            .save(&PersistedSession {
                range: Some(TrackRange::new(1, 2)),
                ..PersistedSession::default()
            })
            .await
            .unwrap();
        assert!(store.raw(RANGE_KEY).is_some());

        sessions.save(&PersistedSession::default()).await.unwrap();
        assert!(store.raw(RANGE_KEY).is_none());
        assert!(store.raw(SLEEP_TIMER_KEY).is_none());
    }

    #[tokio::test]
    async fn malformed_range_is_ignored() {
        let (store, _, sessions) = session_store();
        store.set_string(RANGE_KEY, "\"not a range\"").await.unwrap();
        let session = sessions.load(None).await.unwrap();
        assert_eq!(session.range, None);
    }

    #[test]
    fn clock_going_backwards_does_not_extend() {
        let timer = SleepTimerState::new(Duration::from_secs(10), 5_000);
        assert_eq!(timer.remaining_at(1_000), Duration::from_secs(10));
        assert_eq!(timer.remaining_at(20_000), Duration::ZERO);
    }
}
