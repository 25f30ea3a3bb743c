//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the playback engine:
//! - Logging and tracing setup
//! - Configuration (host bridge injection)
//! - Event bus
//!
//! The engine itself lives in `core-playback`; this crate has no playback
//! semantics of its own.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
