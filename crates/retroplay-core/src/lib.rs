//! Game-emulation playback engine
//!
//! Host-side orchestration of an emulation core: a real-time frame loop
//! with play-speed and rewind control, audio-driven framerate correction,
//! and the session/registry plumbing around it. The emulation core itself
//! is an external plugin behind the [`GameSession`] trait; mapped
//! controller input reaches it through the `retroplay-input` crate.
//!
//! # Components
//! - [`GameSession`] / [`AvSink`]: the plugin boundary
//! - [`GameClient`]: host-side wrapper for one loaded core
//! - [`SessionRegistry`]: installed clients and the content they open
//! - [`RewindBuffer`]: bounded ring of serialized state for rewind support
//! - [`RetroPlayer`]: the playback thread and its control surface
//!
//! # Crate feature flags
//! - `streaming` (default): real-time audio output via rodio; without it
//!   audio stays disabled and the framerate correction factor is 1.0
//!
//! # Quick start
//! ```no_run
//! use retroplay::{PlayerOptions, RetroPlayer, SessionRegistry};
//!
//! # fn registry() -> SessionRegistry { SessionRegistry::new() }
//! let registry = registry();
//! let player = RetroPlayer::new();
//!
//! let id = registry.candidates("game.nes", None).into_iter().next().unwrap();
//! let session = registry.create(&id).unwrap();
//! if player.open_file(session, "game.nes", PlayerOptions::default()) {
//!     player.pause();
//!     player.pause(); // resume
//!     player.set_speed(-2); // rewind at 2x
//!     player.close_file();
//! }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod player;
pub mod registry;
pub mod rewind;
pub mod session;

/// Play speed representing pause.
pub const PLAYSPEED_PAUSED: i32 = 0;

/// Play speed representing normal 1x playback.
pub const PLAYSPEED_NORMAL: i32 = 1000;

/// Rewind paces this many times slower than the equivalent forward speed.
pub const REWIND_SCALE: i32 = 4;

/// Lowest framerate a game client may report.
pub const MIN_VALID_FRAME_RATE: f64 = 5.0;

/// Highest framerate a game client may report.
pub const MAX_VALID_FRAME_RATE: f64 = 100.0;

/// Error types for playback operations
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session refused an operation
    #[error("Session error: {0}")]
    Session(String),

    /// The core reported a framerate outside the allowable range
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PlayerError {
    fn from(msg: String) -> Self {
        PlayerError::Other(msg)
    }
}

impl From<&str> for PlayerError {
    fn from(msg: &str) -> Self {
        PlayerError::Other(msg.to_string())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;

// Public API exports
pub use client::{GameClient, GameClientInput};
pub use player::audio::PlayerAudio;
pub use player::clock::PlaybackClock;
pub use player::video::{NullVideoSink, PlayerVideo, VideoSink};
pub use player::{PlayerOptions, RetroPlayer};
pub use registry::{SessionFactory, SessionRegistry};
pub use rewind::RewindBuffer;
pub use session::{AvSink, GameSession, NullAvSink, PixelFormat, SampleFormat};
