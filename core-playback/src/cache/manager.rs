//! # Resource Cache
//!
//! Bounded set of speculative, pre-fetched resources keyed by track id.
//!
//! Every mutation (admit, evict, claim, status update) happens inside one
//! short critical section with no suspension point, so the background
//! pre-fetch path and the engine's promote path can interleave freely.
//! The lock is never held across an `.await`.

use crate::cache::config::{CacheConfig, EVICTION_HEADROOM};
use crate::cache::stats::CacheStats;
use crate::models::{Track, TrackId};
use crate::traits::UrlResolver;
use bridge_traits::{MediaResource, ResourceFactory};
use core_async::time::{timeout, Instant};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::strip_path;
use futures::future::join_all;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Loading,
    Ready,
    Error(String),
}

/// One pre-fetched resource.
#[derive(Clone)]
pub struct CacheEntry {
    pub track_id: TrackId,
    pub resource: Arc<dyn MediaResource>,
    pub status: CacheStatus,
    pub last_accessed: Instant,
}

impl CacheEntry {
    fn loading(track_id: TrackId, resource: Arc<dyn MediaResource>) -> Self {
        Self {
            track_id,
            resource,
            status: CacheStatus::Loading,
            last_accessed: Instant::now(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == CacheStatus::Loading
    }

    pub fn is_ready(&self) -> bool {
        self.status == CacheStatus::Ready
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("track_id", &self.track_id)
            .field("resource", &self.resource.id())
            .field("status", &self.status)
            .field("last_accessed", &self.last_accessed)
            .finish()
    }
}

/// Pre-fetch cache with recency-based eviction.
pub struct ResourceCache {
    config: CacheConfig,
    factory: Arc<dyn ResourceFactory>,
    resolver: Arc<dyn UrlResolver>,
    entries: Mutex<LruCache<TrackId, CacheEntry>>,
    event_bus: Option<EventBus>,
}

impl ResourceCache {
    pub fn new(
        config: CacheConfig,
        factory: Arc<dyn ResourceFactory>,
        resolver: Arc<dyn UrlResolver>,
    ) -> Self {
        Self {
            config,
            factory,
            resolver,
            entries: Mutex::new(LruCache::unbounded()),
            event_bus: None,
        }
    }

    /// Publish `Preloaded` / `PreloadFailed` / `Evicted` on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Pre-fetch `tracks`, in order of admission.
    ///
    /// Best-effort: each pre-fetch is awaited independently and failures are
    /// logged, never returned.
    #[instrument(skip(self, tracks), fields(count = tracks.len()))]
    pub async fn preload(&self, tracks: Vec<Track>) {
        join_all(tracks.into_iter().map(|track| self.preload_one(track))).await;
    }

    async fn preload_one(&self, track: Track) {
        let id = track.id;
        let (resource, evicted) = {
            let mut entries = self.entries.lock();

            if let Some(existing) = entries.get_mut(&id) {
                match existing.status {
                    CacheStatus::Ready | CacheStatus::Loading => {
                        existing.last_accessed = Instant::now();
                        return;
                    }
                    CacheStatus::Error(_) => {}
                }
            }
            if let Some(failed) = entries.pop(&id) {
                failed.resource.release();
            }

            let evicted = Self::evict_locked(&mut entries, self.config.max_size);
            if entries.len() >= self.config.max_size {
                debug!(
                    "Cache full of in-flight pre-fetches, skipping track {}",
                    id
                );
                drop(entries);
                self.report_evicted(&evicted);
                return;
            }

            let locator = self.resolver.resolve(id);
            debug!("Pre-fetching track {} from {}", id, strip_path(&locator));
            let resource = self.factory.create(&locator);
            entries.put(id, CacheEntry::loading(id, resource.clone()));
            (resource, evicted)
        };
        self.report_evicted(&evicted);

        let outcome = match timeout(self.config.preload_timeout, resource.wait_ready()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "not ready after {:?}",
                self.config.preload_timeout
            )),
        };

        let still_cached = {
            let mut entries = self.entries.lock();
            match entries.peek_mut(&id) {
                Some(entry) if entry.resource.id() == resource.id() => {
                    entry.last_accessed = Instant::now();
                    entry.status = match &outcome {
                        Ok(()) => CacheStatus::Ready,
                        Err(message) => CacheStatus::Error(message.clone()),
                    };
                    true
                }
                _ => false,
            }
        };

        if !still_cached {
            // Claimed or evicted while loading; the new owner decides its fate.
            debug!("Track {} left the cache before its pre-fetch settled", id);
            return;
        }

        match outcome {
            Ok(()) => {
                info!("Pre-loaded track {}: {}", id, track.title);
                self.emit(CacheEvent::Preloaded { track_id: id.0 });
            }
            Err(message) => {
                warn!("Failed to pre-load track {}: {}", id, message);
                self.emit(CacheEvent::PreloadFailed {
                    track_id: id.0,
                    message,
                });
            }
        }
    }

    /// Ready resource for `id`, refreshing its recency. Loading and failed
    /// entries are never returned.
    pub fn lookup(&self, id: TrackId) -> Option<Arc<dyn MediaResource>> {
        let mut entries = self.entries.lock();
        match entries.get_mut(&id) {
            Some(entry) if entry.is_ready() => {
                entry.last_accessed = Instant::now();
                debug!("Cache hit for track {}", id);
                Some(entry.resource.clone())
            }
            _ => None,
        }
    }

    /// Remove the entry for `id`, handing its resource to the caller.
    pub fn claim(&self, id: TrackId) -> Option<CacheEntry> {
        self.entries.lock().pop(&id)
    }

    /// Remove the entry for `id` and return its resource if it was ready.
    ///
    /// A loading or failed entry is released instead, so the caller's fresh
    /// resource is the only handle bound to the track.
    pub fn claim_ready(&self, id: TrackId) -> Option<Arc<dyn MediaResource>> {
        let entry = self.entries.lock().pop(&id)?;
        if entry.is_ready() {
            debug!("Promoting cached resource for track {}", id);
            Some(entry.resource)
        } else {
            debug!("Discarding unready cache entry for track {}", id);
            entry.resource.detach();
            entry.resource.release();
            None
        }
    }

    /// Make room for one more entry. Returns the evicted track ids.
    pub fn evict_if_full(&self) -> Vec<TrackId> {
        let evicted = Self::evict_locked(&mut self.entries.lock(), self.config.max_size);
        self.report_evicted(&evicted);
        evicted.iter().map(|entry| entry.track_id).collect()
    }

    /// Evicts the least recently used non-loading entries, at least one and
    /// at most as many as leave `EVICTION_HEADROOM` free slots.
    fn evict_locked(
        entries: &mut LruCache<TrackId, CacheEntry>,
        max_size: usize,
    ) -> Vec<CacheEntry> {
        let len = entries.len();
        if len < max_size {
            return Vec::new();
        }

        let wanted = (len + 1 - max_size)
            .max(1)
            .min(len + EVICTION_HEADROOM - max_size);
        let victims: Vec<TrackId> = entries
            .iter()
            .rev()
            .filter(|(_, entry)| !entry.is_loading())
            .take(wanted)
            .map(|(id, _)| *id)
            .collect();

        victims
            .into_iter()
            .filter_map(|id| entries.pop(&id))
            .inspect(|entry| {
                entry.resource.detach();
                entry.resource.release();
            })
            .collect()
    }

    fn report_evicted(&self, evicted: &[CacheEntry]) {
        for entry in evicted {
            info!("Evicted cached resource for track {}", entry.track_id);
            self.emit(CacheEvent::Evicted {
                track_id: entry.track_id.0,
            });
        }
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.entries.lock().contains(&id)
    }

    pub fn status(&self, id: TrackId) -> Option<CacheStatus> {
        self.entries.lock().peek(&id).map(|entry| entry.status.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Track ids from most to least recently used.
    pub fn cached_ids(&self) -> Vec<TrackId> {
        self.entries.lock().iter().map(|(id, _)| *id).collect()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let mut stats = CacheStats {
            total: entries.len(),
            max_size: self.config.max_size,
            ..CacheStats::default()
        };
        for (_, entry) in entries.iter() {
            match entry.status {
                CacheStatus::Loading => stats.loading += 1,
                CacheStatus::Ready => stats.ready += 1,
                CacheStatus::Error(_) => stats.errored += 1,
            }
        }
        stats
    }

    /// Release every cached resource.
    pub fn clear(&self) -> usize {
        let drained: Vec<CacheEntry> = {
            let mut entries = self.entries.lock();
            let mut drained = Vec::with_capacity(entries.len());
            while let Some((_, entry)) = entries.pop_lru() {
                drained.push(entry);
            }
            drained
        };
        for entry in &drained {
            entry.resource.detach();
            entry.resource.release();
        }
        info!("Cleared {} cached resources", drained.len());
        self.emit(CacheEvent::Cleared {
            released: drained.len(),
        });
        drained.len()
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BaseUrlResolver;
    use bridge_traits::playback::testing::FakeFactory;
    use bridge_traits::ResourceError;
    use std::time::Duration;

    fn cache_with(max_size: usize) -> (Arc<FakeFactory>, ResourceCache) {
        let factory = Arc::new(FakeFactory::new());
        let cache = ResourceCache::new(
            CacheConfig::new().with_max_size(max_size),
            factory.clone(),
            Arc::new(BaseUrlResolver::default()),
        );
        (factory, cache)
    }

    #[tokio::test]
    async fn ready_entry_is_returned_by_lookup() {
        let (_, cache) = cache_with(4);
        cache.preload(vec![Track::new(1)]).await;

        assert_eq!(cache.status(TrackId(1)), Some(CacheStatus::Ready));
        assert!(cache.lookup(TrackId(1)).is_some());
        assert!(cache.lookup(TrackId(2)).is_none());
    }

    #[tokio::test]
    async fn failed_entry_is_never_returned_and_is_retried() {
        let (factory, cache) = cache_with(4);
        factory.script("link.1.mp3", |r| {
            r.set_ready_result(Err(ResourceError::NotFound("404".into())))
        });

        cache.preload(vec![Track::new(1)]).await;
        assert!(matches!(cache.status(TrackId(1)), Some(CacheStatus::Error(_))));
        assert!(cache.lookup(TrackId(1)).is_none());
        assert_eq!(cache.stats().errored, 1);

        cache.preload(vec![Track::new(1)]).await;
        assert_eq!(factory.created_count(), 2);
        assert!(factory.created()[0].is_released());
    }

    #[tokio::test]
    async fn existing_entries_are_not_reloaded() {
        let (factory, cache) = cache_with(4);
        cache.preload(vec![Track::new(1), Track::new(2)]).await;
        cache.preload(vec![Track::new(2), Track::new(1)]).await;
        assert_eq!(factory.created_count(), 2);
    }

    #[tokio::test]
    async fn claim_removes_entry() {
        let (_, cache) = cache_with(4);
        cache.preload(vec![Track::new(1)]).await;

        let resource = cache.claim_ready(TrackId(1));
        assert!(resource.is_some());
        assert!(!cache.contains(TrackId(1)));
        assert!(cache.claim_ready(TrackId(1)).is_none());
    }

    #[tokio::test]
    async fn claim_hands_over_any_entry() {
        let (factory, cache) = cache_with(4);
        factory.script("link.2.mp3", |r| {
            r.set_ready_result(Err(ResourceError::NotFound("404".into())))
        });
        cache.preload(vec![Track::new(1), Track::new(2)]).await;

        let ready = cache.claim(TrackId(1)).unwrap();
        assert_eq!(ready.track_id, TrackId(1));
        assert!(ready.is_ready());

        let failed = cache.claim(TrackId(2)).unwrap();
        assert!(matches!(failed.status, CacheStatus::Error(_)));

        assert!(cache.is_empty());
        assert!(cache.claim(TrackId(1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn claim_ready_discards_loading_entry() {
        let (factory, cache) = cache_with(4);
        factory.script("link.1.mp3", |r| r.set_ready_delay(Duration::from_secs(5)));
        let cache = Arc::new(cache);

        let background = cache.clone();
        let task = tokio::spawn(async move { background.preload(vec![Track::new(1)]).await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(cache.status(TrackId(1)), Some(CacheStatus::Loading));
        assert!(cache.claim_ready(TrackId(1)).is_none());
        assert!(factory.created()[0].is_released());

        task.await.unwrap();
        // The settled pre-fetch does not resurrect the entry.
        assert!(!cache.contains(TrackId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_preload_times_out() {
        let (factory, cache) = cache_with(4);
        factory.script("link.1.mp3", |r| r.set_ready_delay(Duration::from_secs(60)));

        cache.preload(vec![Track::new(1)]).await;
        assert!(matches!(cache.status(TrackId(1)), Some(CacheStatus::Error(_))));
    }

    #[tokio::test]
    async fn clear_releases_everything() {
        let (factory, cache) = cache_with(4);
        cache
            .preload(vec![Track::new(1), Track::new(2), Track::new(3)])
            .await;
        assert_eq!(cache.clear(), 3);
        assert!(cache.is_empty());
        assert!(factory.created().iter().all(|r| r.is_released()));
    }

    #[tokio::test]
    async fn evict_if_full_below_capacity_is_noop() {
        let (_, cache) = cache_with(4);
        cache.preload(vec![Track::new(1)]).await;
        assert!(cache.evict_if_full().is_empty());
        assert_eq!(cache.len(), 1);
    }
}
