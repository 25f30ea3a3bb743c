//! # Playback Error Types
//!
//! Failure taxonomy used by the resilience monitor. None of these escape the
//! engine's transport operations; they drive recovery decisions and show up
//! in logs and `PlaybackEvent::Error`.

use bridge_traits::{BridgeError, ResourceError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Recovery taxonomy
    // ========================================================================
    /// Network-class failure; retryable with backoff.
    #[error("Transient network failure: {0}")]
    TransientNetwork(String),

    /// Format unsupported or file missing; skip the track.
    #[error("Resource unplayable: {0}")]
    ResourceUnplayable(String),

    /// A play request raced with a resource swap.
    #[error("Play request aborted by swap: {0}")]
    AbortedBySwap(String),

    /// The platform wants a user gesture before producing audio.
    #[error("Playback permission denied: {0}")]
    PlaybackPermissionDenied(String),

    /// Retry and failure budgets are used up.
    #[error("Recovery exhausted: {0}")]
    Exhausted(String),

    // ========================================================================
    // Setup errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    Config(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// The engine loop is no longer running.
    #[error("Playback engine stopped")]
    EngineStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classification consumed by the resilience monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    TransientNetwork,
    ResourceUnplayable,
    AbortedBySwap,
    PermissionDenied,
    Exhausted,
    Other,
}

impl PlaybackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::TransientNetwork(_) => ErrorKind::TransientNetwork,
            PlaybackError::ResourceUnplayable(_) => ErrorKind::ResourceUnplayable,
            PlaybackError::AbortedBySwap(_) => ErrorKind::AbortedBySwap,
            PlaybackError::PlaybackPermissionDenied(_) => ErrorKind::PermissionDenied,
            PlaybackError::Exhausted(_) => ErrorKind::Exhausted,
            _ => ErrorKind::Other,
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::TransientNetwork(_) | PlaybackError::AbortedBySwap(_)
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::TransientNetwork(_))
    }
}

impl From<ResourceError> for PlaybackError {
    fn from(err: ResourceError) -> Self {
        let message = err.to_string();
        match err {
            ResourceError::Network(_) | ResourceError::Timeout => {
                PlaybackError::TransientNetwork(message)
            }
            ResourceError::Decode(_)
            | ResourceError::SourceNotSupported(_)
            | ResourceError::NotFound(_)
            | ResourceError::Other(_) => PlaybackError::ResourceUnplayable(message),
            ResourceError::Aborted(_) => PlaybackError::AbortedBySwap(message),
            ResourceError::NotAllowed(_) => PlaybackError::PlaybackPermissionDenied(message),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
