//! Media Resource Abstraction
//!
//! A [`MediaResource`] is one stateful, decodable audio handle bound to a
//! single locator: a browser `<audio>` element, a platform media player, a
//! native decoder pipeline. The engine owns at most one *active* resource and
//! a few speculative pre-fetched ones, created through a [`ResourceFactory`].
//!
//! Resources report what happens to them through a [`ResourceEventSink`].
//! A sink is revocable: once its token is cancelled every later `emit` is
//! dropped, so a retired resource can never reach the engine again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use core_async::sync::CancellationToken;

/// Unique identifier for one resource instance.
///
/// Two resources created for the same locator get different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure reported by a resource, mirroring the platform media error classes.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceError {
    #[error("network error while fetching media: {0}")]
    Network(String),

    #[error("media could not be decoded: {0}")]
    Decode(String),

    #[error("media source not supported: {0}")]
    SourceNotSupported(String),

    #[error("media not found: {0}")]
    NotFound(String),

    /// A pending play request was interrupted by a new load or pause.
    #[error("play request aborted: {0}")]
    Aborted(String),

    /// The platform refuses to start audio without a user gesture.
    #[error("playback not allowed: {0}")]
    NotAllowed(String),

    #[error("timed out waiting for media")]
    Timeout,

    #[error("media error: {0}")]
    Other(String),
}

/// How much of the media is buffered, following the HTML media model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Enough data buffered to keep playing.
    pub fn can_play(&self) -> bool {
        *self >= ReadyState::HaveFutureData
    }
}

/// Events a resource delivers to its sink.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    LoadedMetadata { duration: f64 },
    /// Enough data buffered to play through.
    CanPlayThrough,
    /// Audio is actually being produced. This is the decode confirmation,
    /// distinct from a play request being accepted.
    Playing,
    Paused,
    TimeUpdate { position: f64 },
    /// Playback halted waiting for data.
    Waiting,
    /// Fetching stopped delivering data.
    Stalled,
    /// More data arrived.
    Progress,
    Ended,
    Error(ResourceError),
}

/// Point-in-time view of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    /// Current position in seconds
    pub position: f64,
    /// Duration in seconds, once known
    pub duration: Option<f64>,
    pub paused: bool,
    pub ended: bool,
    pub ready_state: ReadyState,
    pub error: Option<ResourceError>,
    pub volume: f32,
    pub muted: bool,
}

impl Default for ResourceSnapshot {
    fn default() -> Self {
        Self {
            position: 0.0,
            duration: None,
            paused: true,
            ended: false,
            ready_state: ReadyState::HaveNothing,
            error: None,
            volume: 1.0,
            muted: false,
        }
    }
}

impl ResourceSnapshot {
    /// Seconds left until the end, when the duration is known.
    pub fn remaining(&self) -> Option<f64> {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d - self.position).max(0.0))
    }
}

/// Revocable delivery target for [`ResourceEvent`]s.
///
/// Every sink handed out for a resource shares the registration's
/// [`CancellationToken`]. Cancelling that token invalidates all of them at
/// once.
#[derive(Clone)]
pub struct ResourceEventSink {
    deliver: Arc<dyn Fn(ResourceEvent) + Send + Sync>,
    revoked: CancellationToken,
}

impl ResourceEventSink {
    pub fn new<F>(revoked: CancellationToken, deliver: F) -> Self
    where
        F: Fn(ResourceEvent) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
            revoked,
        }
    }

    /// Deliver an event. Returns `false` if the sink was revoked.
    pub fn emit(&self, event: ResourceEvent) -> bool {
        if self.revoked.is_cancelled() {
            return false;
        }
        (self.deliver)(event);
        true
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.is_cancelled()
    }
}

impl fmt::Debug for ResourceEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEventSink")
            .field("revoked", &self.revoked.is_cancelled())
            .finish()
    }
}

/// A stateful decodable audio handle.
///
/// Methods take `&self`; implementations use interior mutability so a handle
/// can be shared between the cache and the engine while it changes roles.
#[async_trait::async_trait]
pub trait MediaResource: Send + Sync {
    fn id(&self) -> ResourceId;

    /// Locator currently loaded.
    fn locator(&self) -> String;

    /// Point the resource at `locator` and start fetching. Readiness is
    /// reported through events and [`wait_ready`](Self::wait_ready).
    fn load(&self, locator: &str);

    /// Request playback. Resolves once the platform accepted or refused it.
    async fn play(&self) -> Result<(), ResourceError>;

    fn pause(&self);

    /// Resolves when enough data is buffered to play through, or with the
    /// error that prevented it.
    async fn wait_ready(&self) -> Result<(), ResourceError>;

    fn seek(&self, position: f64);

    fn set_volume(&self, volume: f32);

    fn set_muted(&self, muted: bool);

    fn snapshot(&self) -> ResourceSnapshot;

    /// Route events to `sink`, replacing any previous sink.
    fn attach(&self, sink: ResourceEventSink);

    /// Stop routing events.
    fn detach(&self);

    /// Free the underlying media buffers. The handle is unusable afterwards.
    fn release(&self);
}

/// Creates resources for locators.
pub trait ResourceFactory: Send + Sync {
    /// Create a resource and start loading `locator`.
    fn create(&self, locator: &str) -> Arc<dyn MediaResource>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    //! Scriptable in-memory resources for exercising the engine.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct FakeState {
        locator: String,
        snapshot: ResourceSnapshot,
        sink: Option<ResourceEventSink>,
        play_results: VecDeque<Result<(), ResourceError>>,
        ready_result: Option<Result<(), ResourceError>>,
        ready_delay: Option<Duration>,
        confirm_on_play: bool,
        loads: Vec<String>,
        play_calls: usize,
        pause_calls: usize,
        released: bool,
    }

    /// In-memory [`MediaResource`] whose outcomes are scripted by the test.
    ///
    /// A successful `play` emits [`ResourceEvent::Playing`] unless
    /// [`set_confirm_on_play(false)`](Self::set_confirm_on_play) was called.
    #[derive(Debug)]
    pub struct FakeResource {
        id: ResourceId,
        state: Mutex<FakeState>,
    }

    impl FakeResource {
        pub fn new(locator: &str) -> Self {
            Self {
                id: ResourceId::new(),
                state: Mutex::new(FakeState {
                    locator: locator.to_string(),
                    confirm_on_play: true,
                    ..FakeState::default()
                }),
            }
        }

        /// Queue the outcome of the next `play` call. Unscripted calls succeed.
        pub fn push_play_result(&self, result: Result<(), ResourceError>) {
            self.state.lock().play_results.push_back(result);
        }

        pub fn set_ready_result(&self, result: Result<(), ResourceError>) {
            self.state.lock().ready_result = Some(result);
        }

        pub fn set_ready_delay(&self, delay: Duration) {
            self.state.lock().ready_delay = Some(delay);
        }

        pub fn set_confirm_on_play(&self, confirm: bool) {
            self.state.lock().confirm_on_play = confirm;
        }

        pub fn update_snapshot(&self, update: impl FnOnce(&mut ResourceSnapshot)) {
            update(&mut self.state.lock().snapshot);
        }

        /// Deliver an event to the attached sink. Returns `false` if no live
        /// sink is attached.
        pub fn emit(&self, event: ResourceEvent) -> bool {
            let sink = self.state.lock().sink.clone();
            sink.map(|s| s.emit(event)).unwrap_or(false)
        }

        pub fn has_live_sink(&self) -> bool {
            self.state
                .lock()
                .sink
                .as_ref()
                .is_some_and(|s| !s.is_revoked())
        }

        pub fn loads(&self) -> Vec<String> {
            self.state.lock().loads.clone()
        }

        pub fn play_calls(&self) -> usize {
            self.state.lock().play_calls
        }

        pub fn pause_calls(&self) -> usize {
            self.state.lock().pause_calls
        }

        pub fn is_released(&self) -> bool {
            self.state.lock().released
        }
    }

    #[async_trait::async_trait]
    impl MediaResource for FakeResource {
        fn id(&self) -> ResourceId {
            self.id
        }

        fn locator(&self) -> String {
            self.state.lock().locator.clone()
        }

        fn load(&self, locator: &str) {
            let mut state = self.state.lock();
            state.locator = locator.to_string();
            state.loads.push(locator.to_string());
            state.snapshot.position = 0.0;
            state.snapshot.ended = false;
            state.snapshot.error = None;
        }

        async fn play(&self) -> Result<(), ResourceError> {
            let (result, confirm, sink) = {
                let mut state = self.state.lock();
                state.play_calls += 1;
                let result = state.play_results.pop_front().unwrap_or(Ok(()));
                if result.is_ok() {
                    state.snapshot.paused = false;
                    state.snapshot.ready_state = ReadyState::HaveEnoughData;
                }
                (result, state.confirm_on_play, state.sink.clone())
            };
            if result.is_ok() && confirm {
                if let Some(sink) = sink {
                    sink.emit(ResourceEvent::Playing);
                }
            }
            result
        }

        fn pause(&self) {
            let sink = {
                let mut state = self.state.lock();
                state.pause_calls += 1;
                state.snapshot.paused = true;
                state.sink.clone()
            };
            if let Some(sink) = sink {
                sink.emit(ResourceEvent::Paused);
            }
        }

        async fn wait_ready(&self) -> Result<(), ResourceError> {
            let (delay, result) = {
                let state = self.state.lock();
                (state.ready_delay, state.ready_result.clone())
            };
            if let Some(delay) = delay {
                core_async::time::sleep(delay).await;
            }
            let result = result.unwrap_or(Ok(()));
            if result.is_ok() {
                self.state.lock().snapshot.ready_state = ReadyState::HaveEnoughData;
            }
            result
        }

        fn seek(&self, position: f64) {
            self.state.lock().snapshot.position = position;
        }

        fn set_volume(&self, volume: f32) {
            self.state.lock().snapshot.volume = volume;
        }

        fn set_muted(&self, muted: bool) {
            self.state.lock().snapshot.muted = muted;
        }

        fn snapshot(&self) -> ResourceSnapshot {
            self.state.lock().snapshot.clone()
        }

        fn attach(&self, sink: ResourceEventSink) {
            self.state.lock().sink = Some(sink);
        }

        fn detach(&self) {
            self.state.lock().sink = None;
        }

        fn release(&self) {
            let mut state = self.state.lock();
            state.released = true;
            state.sink = None;
        }
    }

    type Script = Arc<dyn Fn(&FakeResource) + Send + Sync>;

    /// Factory that records every resource it creates.
    ///
    /// Scripts registered for a locator run against each new resource for
    /// that locator before it is handed out.
    #[derive(Default)]
    pub struct FakeFactory {
        created: Mutex<Vec<Arc<FakeResource>>>,
        scripts: Mutex<HashMap<String, Script>>,
    }

    impl FakeFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script<F>(&self, locator: &str, script: F)
        where
            F: Fn(&FakeResource) + Send + Sync + 'static,
        {
            self.scripts
                .lock()
                .insert(locator.to_string(), Arc::new(script));
        }

        pub fn created(&self) -> Vec<Arc<FakeResource>> {
            self.created.lock().clone()
        }

        pub fn created_count(&self) -> usize {
            self.created.lock().len()
        }

        /// Every resource created for `locator`, oldest first.
        pub fn for_locator(&self, locator: &str) -> Vec<Arc<FakeResource>> {
            self.created
                .lock()
                .iter()
                .filter(|r| r.loads().first().map(String::as_str) == Some(locator))
                .cloned()
                .collect()
        }

        /// Most recently created resource.
        pub fn last(&self) -> Option<Arc<FakeResource>> {
            self.created.lock().last().cloned()
        }
    }

    impl ResourceFactory for FakeFactory {
        fn create(&self, locator: &str) -> Arc<dyn MediaResource> {
            let resource = Arc::new(FakeResource::new(locator));
            resource.load(locator);
            let script = self.scripts.lock().get(locator).cloned();
            if let Some(script) = script {
                script(&resource);
            }
            self.created.lock().push(resource.clone());
            resource
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeResource;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn revoked_sink_drops_events() {
        let token = CancellationToken::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let sink = ResourceEventSink::new(token.clone(), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let copy = sink.clone();

        assert!(sink.emit(ResourceEvent::Progress));
        token.cancel();
        assert!(!sink.emit(ResourceEvent::Progress));
        assert!(!copy.emit(ResourceEvent::Ended));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_remaining_requires_known_duration() {
        let mut snapshot = ResourceSnapshot::default();
        assert_eq!(snapshot.remaining(), None);

        snapshot.duration = Some(180.0);
        snapshot.position = 179.5;
        assert_eq!(snapshot.remaining(), Some(0.5));

        snapshot.duration = Some(f64::INFINITY);
        assert_eq!(snapshot.remaining(), None);
    }

    #[test]
    fn ready_state_ordering() {
        assert!(ReadyState::HaveEnoughData.can_play());
        assert!(ReadyState::HaveFutureData.can_play());
        assert!(!ReadyState::HaveCurrentData.can_play());
    }

    #[tokio::test]
    async fn fake_resource_follows_script() {
        let resource = FakeResource::new("a.mp3");
        let token = CancellationToken::new();
        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink_events = events.clone();
        resource.attach(ResourceEventSink::new(token, move |e| {
            sink_events.lock().push(e)
        }));

        resource.push_play_result(Err(ResourceError::NotAllowed("gesture".into())));
        assert!(resource.play().await.is_err());
        assert!(resource.play().await.is_ok());
        resource.pause();

        assert_eq!(resource.play_calls(), 2);
        assert_eq!(
            *events.lock(),
            vec![ResourceEvent::Playing, ResourceEvent::Paused]
        );
    }
}
