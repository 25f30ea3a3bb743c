//! # Playback Engine Demo
//!
//! Plays a four-track catalog end to end against a simulated media resource
//! that advances one second of audio every 50ms, printing engine events as
//! they arrive.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_traits::{
    MediaResource, MemorySettingsStore, ReadyState, ResourceError, ResourceEvent,
    ResourceEventSink, ResourceFactory, ResourceId, ResourceSnapshot,
};
use core_async::task::JoinHandle;
use core_async::time::{sleep, timeout};
use core_playback::traits::{BaseUrlResolver, StaticCatalog};
use core_playback::{PlaybackConfig, PlaybackEngine, TrackId};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(50);

// ============================================================================
// Simulated Resource
// ============================================================================

struct SimState {
    locator: String,
    snapshot: ResourceSnapshot,
    sink: Option<ResourceEventSink>,
    ticker: Option<JoinHandle<()>>,
}

impl SimState {
    fn emit(&self, event: ResourceEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

/// Pretends to decode `duration` seconds of audio.
struct SimulatedTrack {
    id: ResourceId,
    duration: f64,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedTrack {
    fn new(locator: &str, duration: f64) -> Self {
        let snapshot = ResourceSnapshot {
            duration: Some(duration),
            ready_state: ReadyState::HaveEnoughData,
            ..ResourceSnapshot::default()
        };
        Self {
            id: ResourceId::new(),
            duration,
            state: Arc::new(Mutex::new(SimState {
                locator: locator.to_string(),
                snapshot,
                sink: None,
                ticker: None,
            })),
        }
    }

    fn start_ticker(&self) -> JoinHandle<()> {
        let state = self.state.clone();
        let duration = self.duration;
        core_async::spawn(async move {
            loop {
                sleep(TICK).await;
                let mut state = state.lock();
                if state.snapshot.paused {
                    state.ticker = None;
                    return;
                }
                state.snapshot.position = (state.snapshot.position + 1.0).min(duration);
                let position = state.snapshot.position;
                state.emit(ResourceEvent::TimeUpdate { position });
                if position >= duration {
                    state.snapshot.paused = true;
                    state.snapshot.ended = true;
                    state.ticker = None;
                    state.emit(ResourceEvent::Ended);
                    return;
                }
            }
        })
    }
}

#[async_trait::async_trait]
impl MediaResource for SimulatedTrack {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn locator(&self) -> String {
        self.state.lock().locator.clone()
    }

    fn load(&self, locator: &str) {
        let mut state = self.state.lock();
        state.locator = locator.to_string();
        state.snapshot.position = 0.0;
        state.snapshot.ended = false;
        let duration = self.duration;
        state.emit(ResourceEvent::LoadedMetadata { duration });
    }

    async fn play(&self) -> Result<(), ResourceError> {
        let needs_ticker = {
            let mut state = self.state.lock();
            state.snapshot.paused = false;
            state.emit(ResourceEvent::Playing);
            state.ticker.is_none()
        };
        if needs_ticker {
            let ticker = self.start_ticker();
            self.state.lock().ticker = Some(ticker);
        }
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.snapshot.paused = true;
        state.emit(ResourceEvent::Paused);
    }

    async fn wait_ready(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn seek(&self, position: f64) {
        self.state.lock().snapshot.position = position.clamp(0.0, self.duration);
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
        state.sink = None;
        state.snapshot.paused = true;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
    }
}

struct SimulatedFactory {
    duration: f64,
}

impl ResourceFactory for SimulatedFactory {
    fn create(&self, locator: &str) -> Arc<dyn MediaResource> {
        Arc::new(SimulatedTrack::new(locator, self.duration))
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let core = CoreConfig::builder()
        .resource_factory(Arc::new(SimulatedFactory { duration: 5.0 }))
        .settings_store(Arc::new(MemorySettingsStore::new()))
        .build()?;

    let catalog = StaticCatalog::numbered(1, 4).with_title(2, "Second Wind");
    let mut engine = PlaybackEngine::builder(core)
        .config(PlaybackConfig::default().with_default_sleep_timer(None))
        .resolver(Arc::new(BaseUrlResolver::new("https://cdn.example.com/audio")))
        .catalog(Arc::new(catalog))
        .build()?;
    engine.start().await?;
    let loaded = engine.load_queue_from_catalog().await?;
    println!("Loaded {} tracks", loaded);

    let mut events = engine.subscribe();
    let handle = engine.handle();
    let runner = core_async::spawn(engine.run());

    handle.play_track(TrackId(1), None, None)?;

    loop {
        let event = match timeout(Duration::from_secs(10), events.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(_)) => continue,
            Err(_) => {
                println!("No events for 10s, giving up");
                break;
            }
        };

        match &event {
            CoreEvent::Playback(PlaybackEvent::PositionChanged { .. }) => {}
            CoreEvent::Playback(PlaybackEvent::Paused { track_id, .. }) => {
                println!("Queue finished on track {}", track_id);
                break;
            }
            other => println!("{}: {:?}", other.description(), other),
        }
    }

    let snapshot = handle.snapshot().await?;
    println!(
        "Listened for {:.0}s, history holds {} tracks",
        snapshot.total_playtime_secs, snapshot.history_len
    );

    handle.shutdown().await?;
    runner.await?;
    Ok(())
}
