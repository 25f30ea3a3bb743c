//! Application Lifecycle Abstraction
//!
//! Foreground/background transitions. Some platforms stop delivering media
//! events while the app is hidden, so the engine re-inspects its active
//! resource whenever the app becomes visible again.

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Visible and interactive
    Foreground,
    /// Hidden but still running
    Background,
    /// Execution suspended by the platform
    Suspended,
}

impl LifecycleState {
    pub fn is_visible(&self) -> bool {
        matches!(self, LifecycleState::Foreground)
    }
}

#[async_trait::async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Current lifecycle state
    async fn get_state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle transitions
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

#[async_trait::async_trait]
pub trait LifecycleChangeStream: Send {
    /// Next lifecycle state; `None` once the source is gone.
    async fn next(&mut self) -> Option<LifecycleState>;
}
