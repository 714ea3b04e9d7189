//! Audio output and framerate correction
//!
//! The audio sink is the timing reference for the whole player: the output
//! stream runs at whatever rate the device actually supports, and the ratio
//! between that rate and the rate the emulation core reported becomes the
//! framerate correction factor. Video pacing then tracks the audio
//! hardware instead of the core's nominal rate.
//!
//! Sample delivery never blocks the frame loop: frames go into a ring
//! buffer read by the device stream, and writes that find the buffer full
//! are dropped and counted as overruns.

use crate::session::SampleFormat;

/// Player-side audio component.
///
/// Without the `streaming` feature audio is always disabled and the
/// correction factor stays 1.0.
#[derive(Default)]
pub struct PlayerAudio {
    #[cfg(feature = "streaming")]
    stream: Option<stream::AudioStream>,
    sample_rate: u32,
}

impl PlayerAudio {
    /// Create a stopped audio component.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the audio sink for a session reporting `reported_rate` Hz.
    ///
    /// Returns the framerate correction factor, `actual / reported`. A
    /// non-positive reported rate, a missing `streaming` feature or a
    /// failing audio device all disable audio and return 1.0.
    pub fn start(&mut self, reported_rate: f64) -> f64 {
        self.stop();

        if reported_rate <= 0.0 {
            log::error!("Invalid sample rate {reported_rate}, continuing without sound");
            return 1.0;
        }

        #[cfg(feature = "streaming")]
        match stream::AudioStream::open(reported_rate as u32) {
            Ok(stream) => {
                let actual = stream.sample_rate();
                log::debug!(
                    "Created audio stream with sample rate {actual} from reported rate of {reported_rate}"
                );
                self.sample_rate = actual;
                self.stream = Some(stream);
                return f64::from(actual) / reported_rate;
            }
            Err(err) => {
                log::error!("Error creating audio stream with sample rate {reported_rate}: {err}");
            }
        }

        #[cfg(not(feature = "streaming"))]
        log::debug!("Audio output not compiled in, continuing without sound");

        1.0
    }

    /// Whether an audio sink is currently open.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "streaming")]
        {
            self.stream.is_some()
        }
        #[cfg(not(feature = "streaming"))]
        {
            false
        }
    }

    /// Sample rate of the open sink, 0 when disabled.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Deliver decoded audio frames from the session.
    ///
    /// Silently dropped while audio is disabled.
    pub fn frames(&mut self, data: &[i16], frames: usize, format: SampleFormat) {
        let SampleFormat::S16Ne = format;

        #[cfg(feature = "streaming")]
        if let Some(stream) = &self.stream {
            stream.write_frames(data, frames);
        }

        #[cfg(not(feature = "streaming"))]
        let _ = (data, frames);
    }

    /// Close the audio sink. Safe to call when already stopped.
    pub fn stop(&mut self) {
        #[cfg(feature = "streaming")]
        if let Some(stream) = self.stream.take() {
            stream.finish();
            log::debug!("Audio stopped, {} overruns", stream.overruns());
        }

        self.sample_rate = 0;
    }
}

#[cfg(feature = "streaming")]
mod stream {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use rodio::cpal::traits::{DeviceTrait, HostTrait};
    use rodio::{OutputStream, Sink, Source};

    use crate::{PlayerError, Result};

    /// Output channel count of the stream (sessions deliver stereo).
    const CHANNELS: u16 = 2;

    /// Ring depth in seconds of stereo audio.
    const BUFFER_SECONDS: f64 = 0.5;

    /// Ring buffer between the frame loop (producer) and the device stream
    /// (consumer). Positions are atomics; the sample storage is guarded by
    /// a mutex held only for the copy.
    struct SampleRing {
        buffer: Mutex<Vec<f32>>,
        write_pos: AtomicUsize,
        read_pos: AtomicUsize,
        capacity: usize,
        mask: usize,
        overruns: AtomicUsize,
    }

    impl SampleRing {
        fn new(requested_capacity: usize) -> Self {
            let capacity = requested_capacity.next_power_of_two().max(2);
            SampleRing {
                buffer: Mutex::new(vec![0.0; capacity]),
                write_pos: AtomicUsize::new(0),
                read_pos: AtomicUsize::new(0),
                capacity,
                mask: capacity - 1,
                overruns: AtomicUsize::new(0),
            }
        }

        /// Write as many samples as fit; the remainder is dropped and
        /// counted as one overrun.
        fn write(&self, samples: &[f32]) {
            let mut buf = self.buffer.lock();

            let write_pos = self.write_pos.load(Ordering::Acquire);
            let read_pos = self.read_pos.load(Ordering::Acquire);
            let used = write_pos.wrapping_sub(read_pos);
            let free = self.capacity - 1 - used;

            let to_write = samples.len().min(free);
            if to_write < samples.len() {
                self.overruns.fetch_add(1, Ordering::Relaxed);
            }
            if to_write == 0 {
                return;
            }

            let start = write_pos & self.mask;
            if start + to_write <= self.capacity {
                buf[start..start + to_write].copy_from_slice(&samples[..to_write]);
            } else {
                let first = self.capacity - start;
                buf[start..].copy_from_slice(&samples[..first]);
                buf[..to_write - first].copy_from_slice(&samples[first..to_write]);
            }
            drop(buf);

            self.write_pos
                .store(write_pos.wrapping_add(to_write), Ordering::Release);
        }

        /// Read up to `dest.len()` samples; returns the count read.
        fn read(&self, dest: &mut [f32]) -> usize {
            let buf = self.buffer.lock();

            let write_pos = self.write_pos.load(Ordering::Acquire);
            let read_pos = self.read_pos.load(Ordering::Acquire);
            let available = write_pos.wrapping_sub(read_pos);

            let to_read = dest.len().min(available);
            if to_read == 0 {
                return 0;
            }

            let start = read_pos & self.mask;
            if start + to_read <= self.capacity {
                dest[..to_read].copy_from_slice(&buf[start..start + to_read]);
            } else {
                let first = self.capacity - start;
                dest[..first].copy_from_slice(&buf[start..]);
                dest[first..to_read].copy_from_slice(&buf[..to_read - first]);
            }
            drop(buf);

            self.read_pos
                .store(read_pos.wrapping_add(to_read), Ordering::Release);
            to_read
        }

        fn overruns(&self) -> usize {
            self.overruns.load(Ordering::Relaxed)
        }
    }

    /// Device source pulling samples from the ring; underruns play silence
    /// so the stream stays alive between frames.
    struct RingSource {
        ring: Arc<SampleRing>,
        finished: Arc<AtomicBool>,
        sample_rate: u32,
        batch: Vec<f32>,
        batch_pos: usize,
    }

    impl Source for RingSource {
        fn current_frame_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> u16 {
            CHANNELS
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    impl Iterator for RingSource {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            if self.finished.load(Ordering::Relaxed) {
                return None;
            }

            if self.batch_pos >= self.batch.len() {
                let read = self.ring.read(&mut self.batch);
                self.batch_pos = 0;
                if read == 0 {
                    // Underrun: keep the stream alive with silence
                    self.batch.fill(0.0);
                }
            }

            let sample = self.batch[self.batch_pos];
            self.batch_pos += 1;
            Some(sample)
        }
    }

    /// An open audio device stream.
    pub(super) struct AudioStream {
        _stream: OutputStream,
        sink: Sink,
        ring: Arc<SampleRing>,
        finished: Arc<AtomicBool>,
        sample_rate: u32,
    }

    impl AudioStream {
        /// Open the default output device.
        ///
        /// The stream runs at the device's preferred rate, which is what
        /// the caller turns into the framerate correction factor.
        pub(super) fn open(reported_rate: u32) -> Result<Self> {
            let host = rodio::cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| PlayerError::AudioDevice("no output device".to_string()))?;

            // The device may not support the reported rate; use what it
            // prefers and let the correction factor absorb the difference
            let sample_rate = device
                .default_output_config()
                .map(|config| config.sample_rate().0)
                .unwrap_or(reported_rate);

            let (stream, handle) = OutputStream::try_from_device(&device)
                .map_err(|e| PlayerError::AudioDevice(e.to_string()))?;
            let sink =
                Sink::try_new(&handle).map_err(|e| PlayerError::AudioDevice(e.to_string()))?;

            let capacity = (f64::from(sample_rate) * f64::from(CHANNELS) * BUFFER_SECONDS) as usize;
            let ring = Arc::new(SampleRing::new(capacity));
            let finished = Arc::new(AtomicBool::new(false));

            sink.append(RingSource {
                ring: Arc::clone(&ring),
                finished: Arc::clone(&finished),
                sample_rate,
                batch: vec![0.0; 1024],
                batch_pos: 1024,
            });

            Ok(AudioStream {
                _stream: stream,
                sink,
                ring,
                finished,
                sample_rate,
            })
        }

        pub(super) fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        /// Convert and enqueue `frames` stereo frames of S16NE samples.
        pub(super) fn write_frames(&self, data: &[i16], frames: usize) {
            let samples = frames * usize::from(CHANNELS);
            let converted: Vec<f32> = data
                .iter()
                .take(samples)
                .map(|&sample| f32::from(sample) / 32768.0)
                .collect();
            self.ring.write(&converted);
        }

        pub(super) fn overruns(&self) -> usize {
            self.ring.overruns()
        }

        /// Tear the stream down; the source terminates on its next pull.
        pub(super) fn finish(&self) {
            self.finished.store(true, Ordering::Relaxed);
            self.sink.pause();
        }
    }
}
