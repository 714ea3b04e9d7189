//! Input handler seam
//!
//! Consumers of translated input (a game client port, a UI action layer)
//! implement [`InputHandler`]. Handlers are shared behind `Arc` across the
//! translation and port layers, so the methods take `&self`; implementations
//! use interior mutability.

/// Receives controller-feature events translated from raw driver input.
///
/// All methods report whether the event was handled.
pub trait InputHandler: Send + Sync {
    /// Controller profile this handler speaks.
    fn controller_id(&self) -> String;

    /// A digital feature changed state.
    fn on_button_press(&self, feature: &str, pressed: bool) -> bool;

    /// An analog scalar feature moved. `magnitude` is in `[0.0, 1.0]`.
    fn on_button_motion(&self, feature: &str, magnitude: f32) -> bool;

    /// An analog stick moved. `x`/`y` are in `[-1.0, 1.0]`, y-up.
    fn on_analog_stick_motion(&self, feature: &str, x: f32, y: f32) -> bool;

    /// An accelerometer reported new values.
    fn on_accelerometer_motion(&self, feature: &str, x: f32, y: f32, z: f32) -> bool;
}
