//! Playback clock
//!
//! Pure frame-pacing arithmetic for the playback loop. The clock tracks the
//! absolute deadline of the next frame; after each emulated frame it hands
//! the loop the time to sleep until and advances by one speed-scaled frame
//! interval. Time is injected so the arithmetic is testable without
//! sleeping.
//!
//! Rewind is paced [`REWIND_SCALE`] times slower than the equivalent
//! forward speed, and a clock that has fallen behind real time snaps
//! forward to "now" instead of bursting to catch up.

use std::time::{Duration, Instant};

use crate::{PLAYSPEED_NORMAL, PLAYSPEED_PAUSED, REWIND_SCALE};

/// Absolute-deadline frame pacer.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    next: Instant,
    frame_time_us: f64,
}

impl PlaybackClock {
    /// Create a clock for the given (already corrected) frame rate.
    #[must_use]
    pub fn new(frame_rate: f64) -> Self {
        PlaybackClock {
            next: Instant::now(),
            frame_time_us: 1_000_000.0 / frame_rate,
        }
    }

    /// Duration of one frame at normal speed.
    #[must_use]
    pub fn frame_time(&self) -> Duration {
        Duration::from_micros(self.frame_time_us as u64)
    }

    /// Restart pacing from `now`, e.g. after resuming from pause.
    pub fn reset(&mut self, now: Instant) {
        self.next = now + self.frame_time();
    }

    /// Deadline to wait for after the frame that just ran, advancing the
    /// clock by one interval at `speed`.
    ///
    /// `speed` must not be [`PLAYSPEED_PAUSED`]; the loop never paces while
    /// paused.
    pub fn next_deadline(&mut self, now: Instant, speed: i32) -> Instant {
        // Catching up after a stall must not burst: slow down by snapping
        // the deadline forward to now
        if self.next < now {
            self.next = now;
        }
        let deadline = self.next;

        let divisor = if speed > PLAYSPEED_PAUSED {
            i64::from(speed)
        } else {
            i64::from(-speed) / i64::from(REWIND_SCALE)
        }
        .max(1);

        let step_us = self.frame_time_us * f64::from(PLAYSPEED_NORMAL) / divisor as f64;
        self.next += Duration::from_micros(step_us as u64);
        deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_RATE: f64 = 50.0; // 20 ms frames

    fn clock_at(now: Instant) -> PlaybackClock {
        let mut clock = PlaybackClock::new(FRAME_RATE);
        clock.reset(now);
        clock
    }

    #[test]
    fn test_normal_speed_paces_one_frame_per_iteration() {
        let base = Instant::now();
        let mut clock = clock_at(base);

        let first = clock.next_deadline(base, PLAYSPEED_NORMAL);
        let second = clock.next_deadline(base, PLAYSPEED_NORMAL);

        assert_eq!(first - base, Duration::from_millis(20));
        assert_eq!(second - first, Duration::from_millis(20));
    }

    #[test]
    fn test_double_speed_halves_the_interval() {
        let base = Instant::now();
        let mut clock = clock_at(base);

        let first = clock.next_deadline(base, 2 * PLAYSPEED_NORMAL);
        let second = clock.next_deadline(base, 2 * PLAYSPEED_NORMAL);

        assert_eq!(second - first, Duration::from_millis(10));
    }

    #[test]
    fn test_rewind_is_scaled_slower() {
        let base = Instant::now();
        let mut clock = clock_at(base);

        let first = clock.next_deadline(base, -PLAYSPEED_NORMAL);
        let second = clock.next_deadline(base, -PLAYSPEED_NORMAL);

        // -1x rewind paces REWIND_SCALE times slower than 1x forward
        assert_eq!(second - first, Duration::from_millis(20 * REWIND_SCALE as u64));
    }

    #[test]
    fn test_double_rewind_twice_as_fast_as_single() {
        let base = Instant::now();
        let mut clock = clock_at(base);

        let first = clock.next_deadline(base, -2 * PLAYSPEED_NORMAL);
        let second = clock.next_deadline(base, -2 * PLAYSPEED_NORMAL);

        assert_eq!(second - first, Duration::from_millis(10 * REWIND_SCALE as u64));
    }

    #[test]
    fn test_stall_snaps_to_now_instead_of_bursting() {
        let base = Instant::now();
        let mut clock = clock_at(base);

        // The loop stalled for 10 frames
        let late = base + Duration::from_millis(200);
        let deadline = clock.next_deadline(late, PLAYSPEED_NORMAL);

        // No backlog: the next frame is due immediately, not 10 frames ago
        assert_eq!(deadline, late);
        let following = clock.next_deadline(late, PLAYSPEED_NORMAL);
        assert_eq!(following - late, Duration::from_millis(20));
    }

    #[test]
    fn test_tiny_rewind_speed_clamps_divisor() {
        let base = Instant::now();
        let mut clock = clock_at(base);

        // -0.002x: the scaled divisor would round to zero without the clamp
        let first = clock.next_deadline(base, -2);
        let second = clock.next_deadline(base, -2);
        assert!(second > first);
    }
}
