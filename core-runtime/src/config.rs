//! # Core Configuration Module
//!
//! Holds the host bridge implementations the playback engine runs against.
//!
//! ## Overview
//!
//! A [`CoreConfig`] is built through [`CoreConfigBuilder`] and validated
//! fail-fast: a missing required bridge is reported as
//! [`Error::CapabilityMissing`] with a message telling the host what to inject.
//!
//! ## Required Dependencies
//!
//! - `ResourceFactory` - creates decodable audio handles
//! - `SettingsStore` - persists playtime, sleep timer and range filter
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - online/offline signal for retry gating and reconnect
//! - `LifecycleObserver` - foreground recovery
//! - `MediaSession` - OS media controls
//! - `Clock` - wall-clock source (defaults to [`SystemClock`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .resource_factory(Arc::new(HtmlAudioFactory::new()))
//!     .settings_store(Arc::new(LocalStorageSettings::new()))
//!     .network_monitor(Arc::new(NavigatorOnline::new()))
//!     .enable_network_awareness(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    Clock, LifecycleObserver, MediaSession, NetworkMonitor, ResourceFactory, SettingsStore,
    SystemClock,
};
use std::sync::Arc;

/// Host capabilities and switches for one engine instance.
#[derive(Clone)]
pub struct CoreConfig {
    /// Creates media resources (required)
    pub resource_factory: Arc<dyn ResourceFactory>,

    /// Persistent key-value store (required)
    pub settings_store: Arc<dyn SettingsStore>,

    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    pub media_session: Option<Arc<dyn MediaSession>>,

    pub clock: Arc<dyn Clock>,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("resource_factory", &"ResourceFactory { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "network_monitor",
                &self.network_monitor.as_ref().map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field(
                "media_session",
                &self.media_session.as_ref().map(|_| "MediaSession { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Gate retries on connectivity and reload on reconnect
    pub enable_network_awareness: bool,

    /// Re-inspect the active resource when the app becomes visible
    pub enable_foreground_recovery: bool,

    /// Persist playtime, sleep timer and range filter
    pub enable_session_persistence: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_network_awareness: false,
            enable_foreground_recovery: false,
            enable_session_persistence: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks that enabled features have the bridges they need.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_foreground_recovery && self.lifecycle_observer.is_none() {
            return Err(Error::Config(
                "Foreground recovery enabled but no LifecycleObserver provided. \
                 Disable the feature or inject a LifecycleObserver implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn resource_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ResourceFactory".to_string(),
        message: "ResourceFactory implementation is required to create audio handles. \
                 Web: wrap HTMLAudioElement. \
                 Desktop/Mobile: wrap the platform media player."
            .to_string(),
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for session persistence. \
                 Web: inject a localStorage-backed store. \
                 Tests: use bridge_traits::MemorySettingsStore."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    resource_factory: Option<Arc<dyn ResourceFactory>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    media_session: Option<Arc<dyn MediaSession>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn resource_factory(mut self, factory: Arc<dyn ResourceFactory>) -> Self {
        self.resource_factory = Some(factory);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    pub fn media_session(mut self, session: Arc<dyn MediaSession>) -> Self {
        self.media_session = Some(session);
        self
    }

    /// Override the wall clock (tests use `ManualClock`).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    pub fn enable_foreground_recovery(mut self, enabled: bool) -> Self {
        self.features.enable_foreground_recovery = enabled;
        self
    }

    pub fn enable_session_persistence(mut self, enabled: bool) -> Self {
        self.features.enable_session_persistence = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// [`Error::CapabilityMissing`] when a required bridge was not provided,
    /// [`Error::Config`] when an enabled feature lacks its bridge.
    pub fn build(self) -> Result<CoreConfig> {
        let resource_factory = self
            .resource_factory
            .ok_or_else(resource_factory_missing_error)?;
        let settings_store = self
            .settings_store
            .ok_or_else(settings_store_missing_error)?;

        let config = CoreConfig {
            resource_factory,
            settings_store,
            network_monitor: self.network_monitor,
            lifecycle_observer: self.lifecycle_observer,
            media_session: self.media_session,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::network::{NetworkChangeStream, NetworkInfo};
    use bridge_traits::playback::testing::FakeFactory;
    use bridge_traits::MemorySettingsStore;

    struct StaticNetwork;

    #[async_trait]
    impl NetworkMonitor for StaticNetwork {
        async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
            Ok(NetworkInfo::online())
        }

        async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
            Err(bridge_traits::BridgeError::NotAvailable(
                "static network".to_string(),
            ))
        }
    }

    fn base() -> CoreConfigBuilder {
        CoreConfig::builder()
            .resource_factory(Arc::new(FakeFactory::new()))
            .settings_store(Arc::new(MemorySettingsStore::new()))
    }

    #[test]
    fn test_build_with_required_bridges() {
        let config = base().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.network_monitor.is_none());
        assert!(config.features.enable_session_persistence);
    }

    #[test]
    fn test_missing_resource_factory() {
        let err = CoreConfig::builder()
            .settings_store(Arc::new(MemorySettingsStore::new()))
            .build()
            .unwrap_err();
        match err {
            Error::CapabilityMissing { capability, .. } => {
                assert_eq!(capability, "ResourceFactory")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_settings_store() {
        let err = CoreConfig::builder()
            .resource_factory(Arc::new(FakeFactory::new()))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "SettingsStore"
        ));
    }

    #[test]
    fn test_network_awareness_requires_monitor() {
        assert!(matches!(
            base().enable_network_awareness(true).build(),
            Err(Error::Config(_))
        ));

        let config = base()
            .network_monitor(Arc::new(StaticNetwork))
            .enable_network_awareness(true)
            .build()
            .unwrap();
        assert!(config.features.enable_network_awareness);
    }

    #[test]
    fn test_foreground_recovery_requires_observer() {
        assert!(base().enable_foreground_recovery(true).build().is_err());
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        assert!(base().event_buffer_size(0).build().is_err());
    }
}
