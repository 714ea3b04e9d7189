//! Game client
//!
//! Host-side wrapper around one loaded [`GameSession`]. The client owns the
//! session's lifecycle (open/close), snapshots the rates it reported at
//! open time, and carries the framerate correction factor the audio sink
//! derives. It is also where mapped controller input re-enters the session:
//! [`GameClientInput`] implements the input-handler seam for one port and
//! forwards feature events into the session.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use retroplay_input::{DeviceType, InputHandler, PortManager};

use crate::session::{AvSink, GameSession};
use crate::{PlayerError, Result, MAX_VALID_FRAME_RATE, MIN_VALID_FRAME_RATE};

/// One loaded emulation core and its playing state.
pub struct GameClient {
    session: Box<dyn GameSession>,
    file_path: Option<String>,
    frame_rate: f64,
    sample_rate: f64,
    frame_rate_correction: f64,
}

impl GameClient {
    /// Wrap a session that is not yet playing.
    pub fn new(session: Box<dyn GameSession>) -> Self {
        GameClient {
            session,
            file_path: None,
            frame_rate: 0.0,
            sample_rate: 0.0,
            frame_rate_correction: 1.0,
        }
    }

    /// Open `path` in the session and snapshot its reported rates.
    ///
    /// Fails without mutating state when a file is already open, when the
    /// session refuses the file, or when the reported framerate is outside
    /// the allowable range.
    pub fn open_file(&mut self, path: &str) -> Result<()> {
        if self.file_path.is_some() {
            return Err(PlayerError::Session("a file is already open".to_string()));
        }

        self.session.open(path)?;

        let frame_rate = self.session.frame_rate();
        if !(MIN_VALID_FRAME_RATE..=MAX_VALID_FRAME_RATE).contains(&frame_rate) {
            self.session.close();
            return Err(PlayerError::InvalidFrameRate(frame_rate));
        }

        self.frame_rate = frame_rate;
        self.sample_rate = self.session.sample_rate();
        self.frame_rate_correction = 1.0;
        self.file_path = Some(path.to_string());
        log::debug!("Game client opened {path} at {frame_rate} fps");
        Ok(())
    }

    /// Close the session. Safe to call when nothing is open.
    pub fn close_file(&mut self) {
        if self.file_path.take().is_some() {
            self.session.close();
        }
    }

    /// True between a successful `open_file` and `close_file`.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.file_path.is_some()
    }

    /// Path of the open file, if any.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// Corrected frame rate: the nominal rate scaled by the audio-derived
    /// correction factor.
    #[must_use]
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate * self.frame_rate_correction
    }

    /// Audio sample rate reported at open time.
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Set the correction factor so video pacing tracks the audio clock.
    pub fn set_frame_rate_correction(&mut self, factor: f64) {
        self.frame_rate_correction = factor;
    }

    /// Advance the session one frame.
    pub fn run_frame(&mut self, av: &mut dyn AvSink) {
        self.session.run_frame(av);
    }

    /// Step the session backward; returns frames actually rewound.
    pub fn rewind_frames(&mut self, frames: usize) -> usize {
        self.session.rewind_frames(frames)
    }

    /// Frames currently held in the session's rewind buffer.
    #[must_use]
    pub fn frames_available(&self) -> usize {
        self.session.frames_available()
    }

    /// Rewind buffer capacity, 0 when rewind is unsupported.
    #[must_use]
    pub fn max_frames(&self) -> usize {
        self.session.max_frames()
    }

    /// Forward a digital feature event to the session.
    pub fn button_press(&mut self, port: u32, feature: &str, pressed: bool) -> bool {
        self.session.button_press(port, feature, pressed)
    }

    /// Forward an analog scalar event to the session.
    pub fn button_motion(&mut self, port: u32, feature: &str, magnitude: f32) -> bool {
        self.session.button_motion(port, feature, magnitude)
    }

    /// Forward an analog stick event to the session.
    pub fn analog_stick_motion(&mut self, port: u32, feature: &str, x: f32, y: f32) -> bool {
        self.session.analog_stick_motion(port, feature, x, y)
    }

    /// Forward an accelerometer event to the session.
    pub fn accelerometer_motion(
        &mut self,
        port: u32,
        feature: &str,
        x: f32,
        y: f32,
        z: f32,
    ) -> bool {
        self.session.accelerometer_motion(port, feature, x, y, z)
    }
}

/// Input handler for one port of a game client.
///
/// Holds the client weakly: once the player releases the client, events
/// arriving on stale port assignments fall through unhandled instead of
/// keeping the session alive.
pub struct GameClientInput {
    port: u32,
    controller_id: String,
    client: Weak<Mutex<GameClient>>,
}

impl GameClientInput {
    /// Open `port` on the port manager, routing its input into `client`.
    pub fn open(
        ports: &PortManager,
        client: &Arc<Mutex<GameClient>>,
        port: u32,
        controller_id: &str,
    ) -> Arc<Self> {
        let input = Arc::new(GameClientInput {
            port,
            controller_id: controller_id.to_string(),
            client: Arc::downgrade(client),
        });
        ports.open_port(
            Arc::clone(&input) as Arc<dyn InputHandler>,
            port,
            DeviceType::Joystick,
        );
        input
    }

    /// Close this port on the port manager.
    pub fn close(self: &Arc<Self>, ports: &PortManager) {
        let handler = Arc::clone(self) as Arc<dyn InputHandler>;
        ports.close_port(&handler);
    }

    /// The port this handler feeds.
    #[must_use]
    pub fn port(&self) -> u32 {
        self.port
    }
}

impl InputHandler for GameClientInput {
    fn controller_id(&self) -> String {
        self.controller_id.clone()
    }

    fn on_button_press(&self, feature: &str, pressed: bool) -> bool {
        match self.client.upgrade() {
            Some(client) => client.lock().button_press(self.port, feature, pressed),
            None => false,
        }
    }

    fn on_button_motion(&self, feature: &str, magnitude: f32) -> bool {
        match self.client.upgrade() {
            Some(client) => client.lock().button_motion(self.port, feature, magnitude),
            None => false,
        }
    }

    fn on_analog_stick_motion(&self, feature: &str, x: f32, y: f32) -> bool {
        match self.client.upgrade() {
            Some(client) => client.lock().analog_stick_motion(self.port, feature, x, y),
            None => false,
        }
    }

    fn on_accelerometer_motion(&self, feature: &str, x: f32, y: f32, z: f32) -> bool {
        match self.client.upgrade() {
            Some(client) => client
                .lock()
                .accelerometer_motion(self.port, feature, x, y, z),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NullAvSink;
    use approx::assert_relative_eq;
    use parking_lot::Mutex as PlMutex;

    struct StubSession {
        frame_rate: f64,
        open_calls: usize,
        close_calls: usize,
        events: Arc<PlMutex<Vec<(u32, String, bool)>>>,
    }

    impl StubSession {
        fn new(frame_rate: f64) -> Self {
            StubSession {
                frame_rate,
                open_calls: 0,
                close_calls: 0,
                events: Arc::new(PlMutex::new(Vec::new())),
            }
        }
    }

    impl GameSession for StubSession {
        fn open(&mut self, _path: &str) -> Result<()> {
            self.open_calls += 1;
            Ok(())
        }

        fn close(&mut self) {
            self.close_calls += 1;
        }

        fn run_frame(&mut self, _av: &mut dyn AvSink) {}

        fn frame_rate(&self) -> f64 {
            self.frame_rate
        }

        fn sample_rate(&self) -> f64 {
            48_000.0
        }

        fn button_press(&mut self, port: u32, feature: &str, pressed: bool) -> bool {
            self.events.lock().push((port, feature.to_string(), pressed));
            true
        }
    }

    #[test]
    fn test_open_snapshots_rates() {
        let mut client = GameClient::new(Box::new(StubSession::new(60.0)));

        assert!(client.open_file("game.rom").is_ok());
        assert!(client.is_playing());
        assert_eq!(client.frame_rate(), 60.0);
        assert_eq!(client.sample_rate(), 48_000.0);
        assert_eq!(client.file_path(), Some("game.rom"));
    }

    #[test]
    fn test_out_of_range_frame_rate_is_fatal() {
        let mut client = GameClient::new(Box::new(StubSession::new(240.0)));

        assert!(matches!(
            client.open_file("game.rom"),
            Err(PlayerError::InvalidFrameRate(_))
        ));
        assert!(!client.is_playing());
    }

    #[test]
    fn test_double_open_refused() {
        let mut client = GameClient::new(Box::new(StubSession::new(60.0)));

        assert!(client.open_file("game.rom").is_ok());
        assert!(client.open_file("other.rom").is_err());
        assert_eq!(client.file_path(), Some("game.rom"));
    }

    #[test]
    fn test_correction_scales_frame_rate() {
        let mut client = GameClient::new(Box::new(StubSession::new(60.0)));
        client.open_file("game.rom").unwrap();

        client.set_frame_rate_correction(1.1);
        assert_relative_eq!(client.frame_rate(), 66.0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut client = GameClient::new(Box::new(StubSession::new(60.0)));
        client.open_file("game.rom").unwrap();

        client.close_file();
        client.close_file();
        assert!(!client.is_playing());
    }

    #[test]
    fn test_port_input_reaches_session() {
        let session = StubSession::new(60.0);
        let events = Arc::clone(&session.events);

        let client = Arc::new(Mutex::new(GameClient::new(Box::new(session))));
        client.lock().open_file("game.rom").unwrap();

        let ports = PortManager::new();
        let input = GameClientInput::open(&ports, &client, 1, "game.controller.default");

        assert!(input.on_button_press("a", true));
        assert_eq!(events.lock().as_slice(), &[(1, "a".to_string(), true)]);

        input.close(&ports);
        assert_eq!(ports.port_count(), 0);
    }

    #[test]
    fn test_released_client_ignores_input() {
        let client = Arc::new(Mutex::new(GameClient::new(Box::new(StubSession::new(60.0)))));
        let ports = PortManager::new();
        let input = GameClientInput::open(&ports, &client, 0, "game.controller.default");

        drop(client);
        assert!(!input.on_button_press("a", true));
    }

    #[test]
    fn test_run_frame_accepts_null_sink() {
        let mut client = GameClient::new(Box::new(StubSession::new(60.0)));
        client.open_file("game.rom").unwrap();
        client.run_frame(&mut NullAvSink);
    }
}
