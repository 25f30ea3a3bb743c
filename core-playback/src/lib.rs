//! # Continuous Playback Engine
//!
//! Decides what plays next, owns the lifecycle of decodable audio resources,
//! pre-fetches likely-upcoming tracks and recovers from network and decode
//! failures without interrupting the listening session.
//!
//! ## Overview
//!
//! - [`engine`]: the playback state machine ([`PlaybackEngine`]) and its
//!   command handle
//! - [`cache`]: bounded LRU of pre-fetched resources
//! - [`resilience`]: retry, skip and cooldown decisions
//! - [`prediction`]: which tracks come next under the current play mode
//! - [`session`]: persisted playtime, sleep timer and range filter
//!
//! Platform concerns (media resources, OS media controls, connectivity,
//! app lifecycle, key-value storage) come in through `bridge-traits`.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod history;
pub mod listeners;
pub mod models;
pub mod prediction;
pub mod resilience;
pub mod session;
pub mod traits;

pub use cache::{CacheConfig, CacheStats, CacheStatus, ResourceCache};
pub use config::PlaybackConfig;
pub use engine::{
    format_time, Command, EngineEvent, PlaybackEngine, PlaybackEngineBuilder, PlaybackStatus,
    PlayerSnapshot, RecoveryAction, TimerKind,
};
pub use error::{ErrorKind, PlaybackError, Result};
pub use handle::EngineHandle;
pub use history::PlayHistory;
pub use listeners::{InstanceId, ListenerRegistration};
pub use models::{PlayMode, Queue, RepeatMode, Track, TrackId, TrackRange};
pub use prediction::{is_upcoming, predict_around, predict_next, predict_previous, PredictionInput};
pub use resilience::{RecoveryDecision, ResilienceMonitor, RetryPolicy};
pub use session::{PersistedSession, SessionStore, SleepTimerState};
pub use traits::{BaseUrlResolver, CatalogProvider, StaticCatalog, UrlResolver};
