//! Time-related abstractions.
//!
//! Re-exports `tokio::time` and adds [`Timer`], a cancellable one-shot
//! callback, and [`TimerSlot`], a holder that guarantees at most one pending
//! timer per purpose (re-arming cancels the previous one).
//!
//! The engine never awaits long delays inline. Backoff, cooldown, stall
//! debounce and the sleep timer are all scheduled as `Timer`s whose callback
//! posts an event back into the engine's queue, so user commands keep flowing
//! while a delay is pending.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{Duration, TimerSlot};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let fired = Arc::new(AtomicUsize::new(0));
//! let mut slot = TimerSlot::new();
//!
//! let counter = fired.clone();
//! slot.arm(Duration::from_millis(5), move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! // Re-arming replaces the pending timer.
//! let counter = fired.clone();
//! slot.arm(Duration::from_millis(5), move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! core_async::time::sleep(Duration::from_millis(20)).await;
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! # }
//! ```

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{interval, sleep, sleep_until, timeout, Instant, Interval, Sleep, Timeout};

use crate::sync::CancellationToken;
use crate::task::JoinHandle;

/// A one-shot callback scheduled on the runtime.
///
/// The callback runs once after `delay` unless the timer is cancelled first.
/// Dropping a `Timer` cancels it.
#[derive(Debug)]
pub struct Timer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Timer {
    /// Schedule `fire` to run after `delay`.
    pub fn after<F>(delay: Duration, fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = crate::task::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = sleep(delay) => fire(),
            }
        });

        Self { token, handle }
    }

    /// Cancel the timer. Has no effect if it already fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` while the callback has neither fired nor been cancelled.
    pub fn is_pending(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Holder for at most one pending [`Timer`].
#[derive(Debug, Default)]
pub struct TimerSlot {
    timer: Option<Timer>,
}

impl TimerSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { timer: None }
    }

    /// Schedule `fire` after `delay`, cancelling whatever was pending.
    pub fn arm<F>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.timer = Some(Timer::after(delay, fire));
    }

    /// Schedule `fire` only if nothing is pending. Returns `true` if armed.
    pub fn arm_if_idle<F>(&mut self, delay: Duration, fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_armed() {
            return false;
        }
        self.arm(delay, fire);
        true
    }

    /// Cancel the pending timer, if any.
    pub fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Returns `true` if a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(Timer::is_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let (count, fire) = counter();
        let timer = Timer::after(Duration::from_secs(10), fire);

        sleep(Duration::from_secs(9)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(timer.is_pending());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (count, fire) = counter();
        let timer = Timer::after(Duration::from_secs(1), fire);
        timer.cancel();
        assert!(!timer.is_pending());

        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_keeps_only_one_pending_timer() {
        let (count, first) = counter();
        let second = {
            let count = count.clone();
            move || {
                count.fetch_add(10, Ordering::SeqCst);
            }
        };

        let mut slot = TimerSlot::new();
        slot.arm(Duration::from_secs(1), first);
        assert!(!slot.arm_if_idle(Duration::from_secs(1), || {}));
        slot.arm(Duration::from_secs(1), second);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert!(!slot.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_cancels_pending_timer() {
        let (count, fire) = counter();
        let mut slot = TimerSlot::new();
        slot.arm(Duration::from_secs(1), fire);
        slot.disarm();
        assert!(!slot.is_armed());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
