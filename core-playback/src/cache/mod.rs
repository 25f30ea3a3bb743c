//! # Resource Cache Module
//!
//! Keeps a small set of pre-fetched, ready-to-play resources so a track swap
//! can skip the network round trip.
//!
//! ## Overview
//!
//! - `preload` fetches predicted tracks in the background, best-effort
//! - `lookup` / `claim_ready` hand a ready resource to the engine, which then
//!   owns it exclusively
//! - eviction is least-recently-used and never touches in-flight pre-fetches
//! - evicted handles are released explicitly
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐   predict_around()   ┌────────────────────┐
//! │ PlaybackEngine           ├─────────────────────>│ prediction         │
//! │  - claim_ready() on swap │                      └────────────────────┘
//! │  - spawn(preload(..))    │
//! └────────┬─────────────────┘
//!          │
//!          v
//! ┌──────────────────────────┐      create()        ┌────────────────────┐
//! │ ResourceCache            ├─────────────────────>│ ResourceFactory    │
//! │  LruCache<TrackId, Entry>│                      └────────────────────┘
//! └──────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, ResourceCache};
//! use core_playback::traits::BaseUrlResolver;
//!
//! let cache = ResourceCache::new(
//!     CacheConfig::new().with_max_size(8),
//!     factory,
//!     Arc::new(BaseUrlResolver::new("https://cdn.example.com")),
//! );
//! cache.preload(upcoming).await;
//! if let Some(resource) = cache.claim_ready(track_id) {
//!     // resource is now owned by the caller
//! }
//! ```

pub mod config;
pub mod manager;
pub mod stats;

pub use config::{CacheConfig, EVICTION_HEADROOM};
pub use manager::{CacheEntry, CacheStatus, ResourceCache};
pub use stats::CacheStats;
