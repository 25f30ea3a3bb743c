//! Async runtime abstraction layer for the playback engine.
//!
//! Every other crate in the workspace depends on this crate instead of naming
//! tokio directly, so the executor can be swapped in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and execution
//! - `time`: Sleep, timeouts, instants and the cancellable one-shot [`Timer`]
//! - `sync`: Synchronization primitives (Mutex, channels, cancellation)
//! - `runtime`: Runtime handles and `block_on`
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{Duration, Timer};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (tx, mut rx) = core_async::sync::mpsc::unbounded_channel();
//! let _timer = Timer::after(Duration::from_millis(10), move || {
//!     let _ = tx.send("fired");
//! });
//! assert_eq!(rx.recv().await, Some("fired"));
//! # }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant, Timer, TimerSlot};
