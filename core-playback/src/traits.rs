//! # Catalog Abstractions
//!
//! The engine does not fetch or parse the catalog. It consumes:
//!
//! - a [`CatalogProvider`] supplying the ordered track list and, on demand,
//!   the real title of a track that still carries its placeholder;
//! - a [`UrlResolver`] mapping a track id to the locator handed to the
//!   `ResourceFactory`.
//!
//! ```rust
//! use core_playback::traits::{BaseUrlResolver, UrlResolver};
//! use core_playback::TrackId;
//!
//! let resolver = BaseUrlResolver::new("https://cdn.example.com/audio/");
//! assert_eq!(
//!     resolver.resolve(TrackId(12)),
//!     "https://cdn.example.com/audio/link.12.mp3"
//! );
//! ```

use crate::error::Result;
use crate::models::{Track, TrackId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of tracks and titles.
///
/// `title` may be slow; the engine only calls it from background tasks.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// The full ordered track list.
    async fn tracks(&self) -> Result<Vec<Track>>;

    /// Real title for `id`, or `None` if the catalog has none.
    async fn title(&self, id: TrackId) -> Result<Option<String>>;
}

/// Maps a track id to a resource locator.
pub trait UrlResolver: Send + Sync {
    fn resolve(&self, id: TrackId) -> String;
}

impl<F> UrlResolver for F
where
    F: Fn(TrackId) -> String + Send + Sync,
{
    fn resolve(&self, id: TrackId) -> String {
        self(id)
    }
}

/// Joins a base URL and the catalog file name with a single `/`.
///
/// An empty base yields a relative locator (`link.{id}.mp3`).
#[derive(Debug, Clone, Default)]
pub struct BaseUrlResolver {
    base: String,
}

impl BaseUrlResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

impl UrlResolver for BaseUrlResolver {
    fn resolve(&self, id: TrackId) -> String {
        let base = self.base.trim_end_matches('/');
        if base.is_empty() {
            id.file_name()
        } else {
            format!("{}/{}", base, id.file_name())
        }
    }
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tracks: Vec<Track>,
    titles: HashMap<TrackId, String>,
}

impl StaticCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            titles: HashMap::new(),
        }
    }

    /// Numbered placeholder tracks `first..=last`.
    pub fn numbered(first: u32, last: u32) -> Self {
        Self::new((first..=last).map(Track::new).collect())
    }

    pub fn with_title(mut self, id: impl Into<TrackId>, title: impl Into<String>) -> Self {
        self.titles.insert(id.into(), title.into());
        self
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self.tracks.clone())
    }

    async fn title(&self, id: TrackId) -> Result<Option<String>> {
        Ok(self.titles.get(&id).cloned())
    }
}
