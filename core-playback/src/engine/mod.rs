//! # Playback Engine
//!
//! Long-lived state machine owning the queue, the play history and the single
//! active media resource.
//!
//! ## Overview
//!
//! ```text
//!  EngineHandle ──┐
//!  MediaSession ──┤                   ┌──────────────────────────┐
//!  resource sinks ┼──> EngineEvent ──>│ PlaybackEngine           │
//!  TimerSlots ────┤    (mpsc queue)   │  queue / history / mode  │
//!  network/app ───┘                   │  active resource         │
//!                                     │  ResilienceMonitor       │
//!                                     └──────┬────────────┬──────┘
//!                                            │            │
//!                                  claim_ready()     spawn(preload())
//!                                            v            v
//!                                     ┌──────────────────────────┐
//!                                     │ ResourceCache            │
//!                                     └──────────────────────────┘
//! ```
//!
//! Every source of change posts an [`EngineEvent`] into one queue and the
//! engine handles them one at a time. Delays (backoff, cooldown, stall
//! debounce, end fallback, sleep timer, persistence) are `TimerSlot`s whose
//! callbacks post back into the same queue, so commands keep flowing while a
//! delay is pending.
//!
//! Listener registrations are revocable: when a resource is retired its
//! token is cancelled, and anything it already queued is recognised as stale
//! by its instance number.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut engine = PlaybackEngine::builder(core_config)
//!     .config(PlaybackConfig::default())
//!     .resolver(Arc::new(BaseUrlResolver::new("https://cdn.example.com/audio")))
//!     .catalog(catalog)
//!     .build()?;
//! engine.start().await?;
//! engine.load_queue_from_catalog().await?;
//!
//! let handle = engine.handle();
//! core_async::spawn(engine.run());
//! handle.play_track(TrackId(1), None, None)?;
//! ```

mod events;
mod recovery;
mod state;
mod transitions;
mod transport;

pub use events::{Command, EngineEvent, RecoveryAction, TimerKind};
pub use state::{format_time, PlaybackStatus, PlayerSnapshot};

use crate::cache::{CacheConfig, ResourceCache};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::handle::EngineHandle;
use crate::history::PlayHistory;
use crate::listeners::{InstanceId, ListenerRegistration};
use crate::models::{PlayMode, Queue, Track, TrackId, TrackRange};
use crate::resilience::{ResilienceMonitor, RetryPolicy};
use crate::session::{PersistedSession, SessionStore};
use crate::traits::{BaseUrlResolver, CatalogProvider, UrlResolver};
use bridge_traits::{
    LifecycleObserver, MediaResource, MediaSession, NetworkMonitor, ResourceFactory,
};
use core_async::sync::mpsc;
use core_async::task::JoinHandle;
use core_async::time::{Instant, TimerSlot};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, Receiver};
use events::EventSender;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The resource currently bound to the engine.
pub(crate) struct ActiveResource {
    pub(crate) track_id: TrackId,
    pub(crate) resource: Arc<dyn MediaResource>,
    pub(crate) registration: ListenerRegistration,
}

impl ActiveResource {
    pub(crate) fn instance(&self) -> InstanceId {
        self.registration.instance()
    }
}

/// The playback state machine.
pub struct PlaybackEngine {
    config: PlaybackConfig,
    factory: Arc<dyn ResourceFactory>,
    resolver: Arc<dyn UrlResolver>,
    catalog: Option<Arc<dyn CatalogProvider>>,
    cache: Arc<ResourceCache>,
    media_session: Option<Arc<dyn MediaSession>>,
    network: Option<Arc<dyn NetworkMonitor>>,
    lifecycle: Option<Arc<dyn LifecycleObserver>>,
    sessions: Option<SessionStore>,
    event_bus: EventBus,
    tx: EventSender,
    rx: mpsc::UnboundedReceiver<EngineEvent>,
    watchers: Vec<JoinHandle<()>>,
    rng: StdRng,

    queue: Queue,
    history: PlayHistory,
    mode: PlayMode,
    range: Option<TrackRange>,
    current: Option<Track>,
    active: Option<ActiveResource>,
    next_instance: InstanceId,
    status: PlaybackStatus,
    /// A swap is in flight; pause side effects are suppressed.
    transitioning: bool,
    /// Last intent expressed by the user (or implied by play_track).
    intent_playing: bool,
    /// End of the active instance was already handled.
    end_handled: bool,
    volume: f32,
    muted: bool,
    resilience: ResilienceMonitor,

    stall_timer: TimerSlot,
    end_timer: TimerSlot,
    recovery_timer: TimerSlot,
    sleep_timer: TimerSlot,
    sleep_deadline: Option<Instant>,
    persist_timer: TimerSlot,

    total_playtime_secs: f64,
    last_position: Option<f64>,
    last_reported_second: Option<u64>,
    session_dirty: bool,
    stopped: bool,
}

/// Builder for [`PlaybackEngine`].
pub struct PlaybackEngineBuilder {
    core: CoreConfig,
    config: PlaybackConfig,
    resolver: Option<Arc<dyn UrlResolver>>,
    catalog: Option<Arc<dyn CatalogProvider>>,
    event_bus: Option<EventBus>,
    rng_seed: Option<u64>,
}

impl PlaybackEngineBuilder {
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Publish on an existing bus instead of creating one.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Seed the shuffle draws (tests).
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<PlaybackEngine> {
        let Self {
            core,
            config,
            resolver,
            catalog,
            event_bus,
            rng_seed,
        } = self;

        config.validate().map_err(PlaybackError::Config)?;
        core.validate()?;

        let event_bus = event_bus.unwrap_or_else(|| EventBus::new(core.event_buffer_size));
        let resolver = resolver.unwrap_or_else(|| Arc::new(BaseUrlResolver::default()));
        let cache = ResourceCache::new(
            CacheConfig::from(&config),
            core.resource_factory.clone(),
            resolver.clone(),
        )
        .with_event_bus(event_bus.clone());

        let features = core.features;
        let sessions = features
            .enable_session_persistence
            .then(|| SessionStore::new(core.settings_store.clone(), core.clock.clone()));
        let network = core
            .network_monitor
            .filter(|_| features.enable_network_awareness);
        let lifecycle = core
            .lifecycle_observer
            .filter(|_| features.enable_foreground_recovery);

        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(PlaybackEngine {
            history: PlayHistory::new(config.history_capacity),
            resilience: ResilienceMonitor::new(RetryPolicy::from(&config)),
            volume: config.default_volume,
            factory: core.resource_factory,
            resolver,
            catalog,
            cache: Arc::new(cache),
            media_session: core.media_session,
            network,
            lifecycle,
            sessions,
            event_bus,
            tx,
            rx,
            watchers: Vec::new(),
            rng,
            queue: Queue::default(),
            mode: PlayMode::default(),
            range: None,
            current: None,
            active: None,
            next_instance: 0,
            status: PlaybackStatus::Idle,
            transitioning: false,
            intent_playing: false,
            end_handled: false,
            muted: false,
            stall_timer: TimerSlot::new(),
            end_timer: TimerSlot::new(),
            recovery_timer: TimerSlot::new(),
            sleep_timer: TimerSlot::new(),
            sleep_deadline: None,
            persist_timer: TimerSlot::new(),
            total_playtime_secs: 0.0,
            last_position: None,
            last_reported_second: None,
            session_dirty: false,
            stopped: false,
            config,
        })
    }
}

impl PlaybackEngine {
    pub fn builder(core: CoreConfig) -> PlaybackEngineBuilder {
        PlaybackEngineBuilder {
            core,
            config: PlaybackConfig::default(),
            resolver: None,
            catalog: None,
            event_bus: None,
            rng_seed: None,
        }
    }

    /// Restore the persisted session and subscribe to host signals.
    pub async fn start(&mut self) -> Result<()> {
        if let Some(sessions) = self.sessions.clone() {
            let session = sessions.load(self.config.default_sleep_timer).await?;
            self.restore_session(session, sessions.now_millis());
        }

        if let Some(network) = self.network.clone() {
            match network.get_network_info().await {
                Ok(info) => {
                    self.resilience.set_online(info.is_online());
                }
                Err(e) => warn!("Could not read initial network state: {}", e),
            }
            match network.subscribe_changes().await {
                Ok(mut changes) => {
                    let tx = self.tx.clone();
                    self.watchers.push(core_async::spawn(async move {
                        while let Some(info) = changes.next().await {
                            let online = info.is_online();
                            if tx.send(EngineEvent::Connectivity { online }).is_err() {
                                break;
                            }
                        }
                    }));
                }
                Err(e) => warn!("Network change subscription unavailable: {}", e),
            }
        }

        if let Some(lifecycle) = self.lifecycle.clone() {
            match lifecycle.subscribe_changes().await {
                Ok(mut changes) => {
                    let tx = self.tx.clone();
                    self.watchers.push(core_async::spawn(async move {
                        while let Some(state) = changes.next().await {
                            if tx.send(EngineEvent::Lifecycle(state)).is_err() {
                                break;
                            }
                        }
                    }));
                }
                Err(e) => warn!("Lifecycle subscription unavailable: {}", e),
            }
        }

        info!(
            "Playback engine started (online={}, persistence={})",
            self.resilience.is_online(),
            self.sessions.is_some()
        );
        Ok(())
    }

    fn restore_session(&mut self, session: PersistedSession, now_ms: i64) {
        self.total_playtime_secs = session.total_playtime_secs;
        self.range = session.range;
        if let Some(remaining) = session.sleep_remaining(now_ms) {
            info!("Sleep timer restored with {:?} remaining", remaining);
            self.arm_sleep_timer(remaining);
        }
        if session.first_run {
            self.mark_session_dirty();
        }
    }

    /// Replace the queue with the catalog's track list.
    pub async fn load_queue_from_catalog(&mut self) -> Result<usize> {
        let catalog = self
            .catalog
            .clone()
            .ok_or_else(|| PlaybackError::Config("no catalog provider configured".to_string()))?;
        let tracks = catalog.tracks().await?;
        let count = tracks.len();
        self.queue.replace(tracks);
        info!("Loaded {} tracks from catalog", count);
        Ok(count)
    }

    /// Drive the engine until shutdown.
    pub async fn run(mut self) {
        info!("Playback engine loop running");
        while let Some(event) = self.rx.recv().await {
            if self.dispatch(event).await.is_break() {
                break;
            }
        }
        info!("Playback engine loop stopped");
    }

    /// Handle every queued event without waiting for new ones. Returns the
    /// number handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            handled += 1;
            if self.dispatch(event).await.is_break() {
                break;
            }
        }
        handled
    }

    async fn dispatch(&mut self, event: EngineEvent) -> ControlFlow<()> {
        match event {
            EngineEvent::Resource { instance, event } => {
                self.on_resource_event(instance, event).await
            }
            EngineEvent::Timer(kind) => self.on_timer(kind).await,
            EngineEvent::Command(command) => return self.on_command(command).await,
            EngineEvent::Connectivity { online } => self.on_connectivity(online).await,
            EngineEvent::Lifecycle(state) => self.on_lifecycle(state).await,
            EngineEvent::TitleResolved { track_id, title } => self.apply_title(track_id, &title),
        }
        ControlFlow::Continue(())
    }

    async fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Stall(instance) if self.is_active(instance) => {
                self.on_stall_timeout().await
            }
            TimerKind::EndFallback(instance) if self.is_active(instance) => {
                self.on_end_fallback().await
            }
            TimerKind::Recovery(instance, action) if self.is_active(instance) => {
                self.run_recovery(action).await
            }
            TimerKind::SleepTimer => self.on_sleep_timer_expired().await,
            TimerKind::Persist => self.persist_now().await,
            stale => debug!("Ignoring timer for a retired resource: {:?}", stale),
        }
    }

    async fn on_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::PlayTrack {
                track_id,
                queue,
                index,
            } => {
                self.play_track(track_id, queue, index).await;
            }
            Command::Next => {
                self.advance_next().await;
            }
            Command::Previous => {
                self.advance_previous().await;
            }
            Command::Play => self.play().await,
            Command::Pause => self.pause(),
            Command::TogglePlay => self.toggle_play().await,
            Command::Seek(position) => self.seek(position),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::ToggleMute => self.toggle_mute(),
            Command::ToggleShuffle => self.toggle_shuffle(),
            Command::SetShuffle(shuffle) => self.set_shuffle(shuffle),
            Command::CycleRepeat => {
                self.cycle_repeat();
            }
            Command::SetRepeat(repeat) => self.set_repeat(repeat),
            Command::SetRange(range) => self.set_range(range),
            Command::SetSleepTimer(duration) => self.set_sleep_timer(duration),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown(reply) => {
                self.shutdown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Cloneable command sender for this engine.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.tx.clone())
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn resilience(&self) -> &ResilienceMonitor {
        &self.resilience
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_playing()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn range(&self) -> Option<TrackRange> {
        self.range
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_online(&self) -> bool {
        self.resilience.is_online()
    }

    pub fn total_playtime_secs(&self) -> f64 {
        self.total_playtime_secs
    }

    /// Instance number of the bound resource.
    pub fn active_instance(&self) -> Option<InstanceId> {
        self.active.as_ref().map(ActiveResource::instance)
    }

    /// The bound resource.
    pub fn active_resource(&self) -> Option<Arc<dyn MediaResource>> {
        self.active.as_ref().map(|active| active.resource.clone())
    }

    pub fn sleep_timer_remaining(&self) -> Option<Duration> {
        self.sleep_deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// `advance_next` would do something.
    pub fn can_play_next(&self) -> bool {
        !self.queue.is_empty()
            && (self.mode.shuffle
                || self.mode.repeat == crate::models::RepeatMode::All
                || self.queue.index() + 1 < self.queue.len())
    }

    /// `advance_previous` would do something.
    pub fn can_play_previous(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn position(&self) -> f64 {
        self.active
            .as_ref()
            .map(|active| active.resource.snapshot().position)
            .unwrap_or(0.0)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let resource = self
            .active
            .as_ref()
            .map(|active| active.resource.snapshot());
        PlayerSnapshot {
            current: self.current.clone(),
            status: self.status,
            position: resource.as_ref().map_or(0.0, |s| s.position),
            duration: resource
                .as_ref()
                .and_then(|s| s.duration)
                .or_else(|| self.current.as_ref().and_then(|t| t.duration)),
            volume: self.volume,
            muted: self.muted,
            shuffle: self.mode.shuffle,
            repeat: self.mode.repeat,
            queue_len: self.queue.len(),
            index: self.queue.index(),
            history_len: self.history.len(),
            range: self.range,
            can_play_next: self.can_play_next(),
            can_play_previous: self.can_play_previous(),
            online: self.resilience.is_online(),
            sleep_timer_remaining: self.sleep_timer_remaining(),
            total_playtime_secs: self.total_playtime_secs,
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    pub(crate) fn is_active(&self, instance: InstanceId) -> bool {
        self.active_instance() == Some(instance)
    }

    pub(crate) fn current_id(&self) -> Option<TrackId> {
        self.current.as_ref().map(|track| track.id)
    }

    pub(crate) fn emit(&self, event: PlaybackEvent) {
        let _ = self.event_bus.emit(CoreEvent::Playback(event));
    }

    pub(crate) fn position_ms(&self) -> u64 {
        (self.position().max(0.0) * 1000.0) as u64
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        for watcher in &self.watchers {
            watcher.abort();
        }
        if let Some(active) = self.active.take() {
            active.registration.revoke();
            active.resource.detach();
        }
    }
}
