//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback engine and the
//! platform it runs on. Each trait represents a capability the engine needs
//! but that is implemented differently per platform (browser, desktop, mobile).
//!
//! ## Traits
//!
//! ### Audio
//! - [`MediaResource`](playback::MediaResource) - One stateful, decodable audio handle
//! - [`ResourceFactory`](playback::ResourceFactory) - Creates handles for a locator
//! - [`MediaSession`](media_session::MediaSession) - Lock-screen / OS media controls
//!
//! ### Platform Signals
//! - [`NetworkMonitor`](network::NetworkMonitor) - Online/offline transitions
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - Foreground/background transitions
//!
//! ### Storage & Utilities
//! - [`SettingsStore`](storage::SettingsStore) - Persistent key-value store
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! between the engine task and its background pre-fetch tasks.

pub mod error;
pub mod lifecycle;
pub mod media_session;
pub mod network;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use media_session::{
    Artwork, MediaAction, MediaActionHandler, MediaMetadata, MediaSession, NoopMediaSession,
    SessionPlaybackState,
};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use playback::{
    MediaResource, ReadyState, ResourceError, ResourceEvent, ResourceEventSink, ResourceFactory,
    ResourceId, ResourceSnapshot,
};
pub use storage::{MemorySettingsStore, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
