//! Network Monitoring Abstraction
//!
//! Provides connectivity status so the engine can hold retries while
//! offline and reload the current track when the connection comes back.

use crate::error::Result;

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

impl NetworkInfo {
    pub fn online() -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: None,
            is_metered: false,
        }
    }

    pub fn offline() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }

    /// `Indeterminate` counts as online; the platform only reports
    /// disconnection when it is sure.
    pub fn is_online(&self) -> bool {
        !matches!(self.status, NetworkStatus::Disconnected)
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Web**: `navigator.onLine` plus `online` / `offline` window events
/// - **Desktop**: System network APIs (NetworkManager, SystemConfiguration)
/// - **Mobile**: ConnectivityManager / Network framework
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network information
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Check if currently connected to any network
    async fn is_connected(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_online())
            .unwrap_or(true)
    }

    /// Subscribe to network status changes
    ///
    /// Implementations emit an item whenever the status changes.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of network status changes
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next network info update; `None` once the source is gone.
    async fn next(&mut self) -> Option<NetworkInfo>;
}
