//! Game session boundary
//!
//! The emulation core is an external plugin; the host drives it through the
//! object-safe [`GameSession`] trait and receives decoded frames through
//! [`AvSink`]. The host never assumes shared state with the implementation
//! beyond these two traits.

use crate::Result;

/// Pixel layout of a delivered video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit 0RGB, native endianness.
    Xrgb8888,
    /// 16-bit 5-6-5 RGB.
    Rgb565,
}

/// Sample layout of delivered audio frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Interleaved signed 16-bit stereo, native endianness.
    S16Ne,
}

/// Host-side receiver for the session's decoded output.
pub trait AvSink {
    /// One decoded video frame.
    fn video_frame(&mut self, data: &[u8], width: u32, height: u32, format: PixelFormat);

    /// A batch of decoded audio frames.
    fn audio_frames(&mut self, data: &[i16], frames: usize, format: SampleFormat);
}

/// Sink that discards all delivered frames.
#[derive(Default)]
pub struct NullAvSink;

impl AvSink for NullAvSink {
    fn video_frame(&mut self, _data: &[u8], _width: u32, _height: u32, _format: PixelFormat) {}

    fn audio_frames(&mut self, _data: &[i16], _frames: usize, _format: SampleFormat) {}
}

/// One loaded emulation core.
///
/// The playback loop drives [`run_frame`](Self::run_frame) once per emulated
/// frame; the input layer feeds the per-port entry points. Sessions that do
/// not support rewind keep the default implementations, which report an
/// empty rewind buffer.
pub trait GameSession: Send {
    /// Load the given content file.
    fn open(&mut self, path: &str) -> Result<()>;

    /// Release the loaded content. Called once per successful `open`.
    fn close(&mut self);

    /// Advance emulation by exactly one frame, delivering output to `av`.
    fn run_frame(&mut self, av: &mut dyn AvSink);

    /// Step backward up to `frames` frames; returns how many were rewound.
    fn rewind_frames(&mut self, _frames: usize) -> usize {
        0
    }

    /// Frames currently held in the rewind buffer.
    fn frames_available(&self) -> usize {
        0
    }

    /// Capacity of the rewind buffer, 0 when rewind is unsupported.
    fn max_frames(&self) -> usize {
        0
    }

    /// Nominal video frame rate reported by the core, in frames/second.
    fn frame_rate(&self) -> f64;

    /// Audio sample rate reported by the core, in Hz. Non-positive values
    /// disable audio.
    fn sample_rate(&self) -> f64 {
        0.0
    }

    /// A digital feature on `port` changed state.
    fn button_press(&mut self, _port: u32, _feature: &str, _pressed: bool) -> bool {
        false
    }

    /// An analog scalar feature on `port` moved.
    fn button_motion(&mut self, _port: u32, _feature: &str, _magnitude: f32) -> bool {
        false
    }

    /// An analog stick on `port` moved.
    fn analog_stick_motion(&mut self, _port: u32, _feature: &str, _x: f32, _y: f32) -> bool {
        false
    }

    /// An accelerometer on `port` reported new values.
    fn accelerometer_motion(
        &mut self,
        _port: u32,
        _feature: &str,
        _x: f32,
        _y: f32,
        _z: f32,
    ) -> bool {
        false
    }
}
