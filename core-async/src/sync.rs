//! Synchronization primitives.
//!
//! Async-aware primitives from `tokio::sync`, plus `CancellationToken` from
//! `tokio-util`. The token is what the engine hands out as the revocation
//! handle of a listener registration: cancelling it invalidates every
//! callback in that group at once.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let child = token.clone();
//! token.cancel();
//! assert!(child.is_cancelled());
//! ```

pub use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock};
pub use tokio_util::sync::CancellationToken;
