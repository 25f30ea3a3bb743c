//! Workspace facade crate.
//!
//! Exposes the playback engine and its runtime behind the `engine` feature so
//! host applications can depend on `playback-engine-workspace` without wiring
//! each crate individually.

#[cfg(feature = "engine")]
pub use core_playback as playback;

#[cfg(feature = "engine")]
pub use core_runtime as runtime;
