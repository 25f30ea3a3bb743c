//! Shared engine harness for the integration tests.

#![allow(dead_code)]

use bridge_traits::playback::testing::{FakeFactory, FakeResource};
use bridge_traits::{ManualClock, MemorySettingsStore};
use core_playback::{PlaybackConfig, PlaybackEngine, Track};
use core_runtime::config::{CoreConfig, CoreConfigBuilder};
use core_runtime::events::{CoreEvent, PlaybackEvent, Receiver};
use std::sync::Arc;
use std::time::Duration;

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Harness {
    pub engine: PlaybackEngine,
    pub factory: Arc<FakeFactory>,
    pub store: Arc<MemorySettingsStore>,
    pub clock: Arc<ManualClock>,
    pub events: Receiver<CoreEvent>,
}

/// No pre-fetching and no default sleep timer, so tests only see the
/// resources they ask for.
pub fn quiet_config() -> PlaybackConfig {
    PlaybackConfig::default()
        .with_preload_window(0, 0)
        .with_default_sleep_timer(None)
}

pub fn queue(count: u32) -> Vec<Track> {
    (1..=count).map(Track::new).collect()
}

pub fn locator(id: u32) -> String {
    format!("link.{}.mp3", id)
}

pub struct HarnessBuilder {
    config: PlaybackConfig,
    store: Arc<MemorySettingsStore>,
    persistence: bool,
    configure: Box<dyn FnOnce(CoreConfigBuilder) -> CoreConfigBuilder>,
    factory: Arc<FakeFactory>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: quiet_config(),
            store: Arc::new(MemorySettingsStore::new()),
            persistence: false,
            configure: Box::new(|core| core),
            factory: Arc::new(FakeFactory::new()),
        }
    }

    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn persistence(mut self, store: Arc<MemorySettingsStore>) -> Self {
        self.store = store;
        self.persistence = true;
        self
    }

    pub fn core(mut self, configure: impl FnOnce(CoreConfigBuilder) -> CoreConfigBuilder + 'static) -> Self {
        self.configure = Box::new(configure);
        self
    }

    /// Scripts resources for `locator` before anything is created.
    pub fn script(self, id: u32, script: impl Fn(&FakeResource) + Send + Sync + 'static) -> Self {
        self.factory.script(&locator(id), script);
        self
    }

    pub async fn start(self) -> Harness {
        let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
        let core = (self.configure)(
            CoreConfig::builder()
                .resource_factory(self.factory.clone())
                .settings_store(self.store.clone())
                .clock(clock.clone())
                .enable_session_persistence(self.persistence),
        )
        .build()
        .unwrap();
        let mut engine = PlaybackEngine::builder(core)
            .config(self.config)
            .rng_seed(42)
            .build()
            .unwrap();
        let events = engine.subscribe();
        engine.start().await.unwrap();
        Harness {
            engine,
            factory: self.factory,
            store: self.store,
            clock,
            events,
        }
    }
}

pub async fn harness() -> Harness {
    HarnessBuilder::new().start().await
}

impl Harness {
    pub fn current(&self) -> Option<u32> {
        self.engine.current_track().map(|t| t.id.0)
    }

    /// Most recent resource created for track `id`.
    pub fn resource(&self, id: u32) -> Arc<FakeResource> {
        self.factory
            .for_locator(&locator(id))
            .last()
            .cloned()
            .unwrap()
    }

    /// Let timers due within `by` fire, then handle what they queued.
    pub async fn settle(&mut self, by: Duration) {
        tokio::time::sleep(by).await;
        self.engine.process_pending().await;
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let CoreEvent::Playback(event) = event {
                seen.push(event);
            }
        }
        seen
    }

    /// `recoverable` flag of every error event published so far.
    pub fn drain_errors(&mut self) -> Vec<bool> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::Error { recoverable, .. } => Some(recoverable),
                _ => None,
            })
            .collect()
    }
}
