//! Video sink
//!
//! The render pipeline is an external collaborator; the player only needs
//! somewhere to hand decoded frames. [`VideoSink`] is that seam and
//! [`PlayerVideo`] is the player-side wrapper that gates delivery on the
//! started state and keeps a frame counter for diagnostics.

use crate::session::PixelFormat;

/// Receiver for decoded video frames.
pub trait VideoSink: Send {
    /// Playback is starting at the given (corrected) frame rate.
    fn start(&mut self, frame_rate: f64);

    /// Playback stopped; release any display resources.
    fn stop(&mut self);

    /// One decoded frame.
    fn frame(&mut self, data: &[u8], width: u32, height: u32, format: PixelFormat);
}

/// Sink that discards all frames.
#[derive(Default)]
pub struct NullVideoSink;

impl VideoSink for NullVideoSink {
    fn start(&mut self, _frame_rate: f64) {}

    fn stop(&mut self) {}

    fn frame(&mut self, _data: &[u8], _width: u32, _height: u32, _format: PixelFormat) {}
}

/// Player-side wrapper around the configured video sink.
pub struct PlayerVideo {
    sink: Box<dyn VideoSink>,
    started: bool,
    frame_count: u64,
}

impl PlayerVideo {
    /// Wrap a sink.
    pub fn new(sink: Box<dyn VideoSink>) -> Self {
        PlayerVideo {
            sink,
            started: false,
            frame_count: 0,
        }
    }

    /// Start the sink for a new session.
    pub fn start(&mut self, frame_rate: f64) {
        self.sink.start(frame_rate);
        self.started = true;
        self.frame_count = 0;
    }

    /// Stop the sink. Safe to call when not started.
    pub fn stop(&mut self) {
        if self.started {
            self.sink.stop();
            self.started = false;
            log::debug!("Video stopped after {} frames", self.frame_count);
        }
    }

    /// Deliver one frame; dropped when the sink is not started.
    pub fn frame(&mut self, data: &[u8], width: u32, height: u32, format: PixelFormat) {
        if !self.started {
            return;
        }
        self.frame_count += 1;
        self.sink.frame(data, width, height, format);
    }

    /// Frames delivered since the last start.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for PlayerVideo {
    fn default() -> Self {
        Self::new(Box::new(NullVideoSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_dropped_until_started() {
        let mut video = PlayerVideo::default();
        video.frame(&[0; 4], 1, 1, PixelFormat::Xrgb8888);
        assert_eq!(video.frame_count(), 0);

        video.start(60.0);
        video.frame(&[0; 4], 1, 1, PixelFormat::Xrgb8888);
        assert_eq!(video.frame_count(), 1);
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let mut video = PlayerVideo::default();
        video.stop();
        video.stop();
    }

    #[test]
    fn test_restart_resets_frame_count() {
        let mut video = PlayerVideo::default();
        video.start(60.0);
        video.frame(&[0; 4], 1, 1, PixelFormat::Rgb565);
        video.stop();

        video.start(50.0);
        assert_eq!(video.frame_count(), 0);
    }
}
