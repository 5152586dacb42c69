//! Control and persistence layer of a Game Boy frontend.
//!
//! This crate sits between a UI shell and two external subsystems, the
//! emulation core and the audio output device, both reached through the traits
//! in [`backend`]. Frontends own a [`controller::RuntimeController`] and feed
//! it UI events and display refresh ticks.

/// Collaborator interfaces: emulation core and audio device.
pub mod backend;

/// Display-refresh input push and frame pull.
pub mod bridge;

/// Device-side callback lock for threaded audio backends.
pub mod callback_lock;

/// `config.ini` persistence: paths, recent programs, color schemes.
pub mod config;

/// Gated runtime reconfiguration.
pub mod controller;

/// Error types.
pub mod error;

/// Scoped audio gate.
pub mod gate;

/// INI reader/writer.
pub mod ini;

/// Color scheme codec.
pub mod palette;

pub use config::ConfigStore;
pub use controller::RuntimeController;
pub use error::{ControlError, LoadError, ParseError, StorageError};
