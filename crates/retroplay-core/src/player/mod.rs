//! Playback engine
//!
//! [`RetroPlayer`] owns the real-time loop that drives a game session: one
//! background thread per open session runs exactly one emulated frame per
//! iteration and paces itself with [`PlaybackClock`]. All control calls
//! (`pause`, `set_speed`, `seek`, `close_file`) are safe from any thread
//! while the loop runs.
//!
//! Control model:
//! - play speed is a signed 1000-based multiplier ([`PLAYSPEED_NORMAL`] is
//!   1.0x, 0 is paused, negative rewinds);
//! - pause/resume uses a wake signal distinct from the stop flag, so a
//!   paused session resumes without tearing the thread down;
//! - stop is advisory: a flag checked once per iteration plus a wake, never
//!   a hard kill, so a hung core cannot block the calling thread.

pub mod audio;
pub mod clock;
pub mod video;

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::client::GameClient;
use crate::session::{AvSink, GameSession, PixelFormat, SampleFormat};
use crate::{PLAYSPEED_NORMAL, PLAYSPEED_PAUSED};

use audio::PlayerAudio;
use clock::PlaybackClock;
use video::{NullVideoSink, PlayerVideo, VideoSink};

/// Options snapshotted when a file is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerOptions {
    /// Open the session paused instead of playing.
    pub start_paused: bool,
}

/// Seek step sizes for [`RetroPlayer::seek`], in seconds.
const SEEK_SECONDS_SMALL: u32 = 1;
const SEEK_SECONDS_LARGE: u32 = 10;

/// Failsafe poll interval while paused, in case a wake signal is missed.
const PAUSE_FAILSAFE: Duration = Duration::from_secs(1);

struct PlayerShared {
    client: Mutex<Option<Arc<Mutex<GameClient>>>>,
    play_speed: AtomicI32,
    // Stop flag of the current session. Each playback thread captures its
    // own flag, so an open racing a previous close can never revive a loop
    // that was already told to stop.
    stop: Mutex<Arc<AtomicBool>>,
    wake_mutex: Mutex<()>,
    wake: Condvar,
    audio: Mutex<PlayerAudio>,
    video: Mutex<PlayerVideo>,
}

impl PlayerShared {
    fn wake(&self) {
        let _guard = self.wake_mutex.lock();
        self.wake.notify_all();
    }
}

/// The game playback core.
pub struct RetroPlayer {
    shared: Arc<PlayerShared>,
    // Serializes open/close transitions; never held across the frame wait
    transition: Mutex<()>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RetroPlayer {
    /// A player that discards video.
    #[must_use]
    pub fn new() -> Self {
        Self::with_video_sink(Box::new(NullVideoSink))
    }

    /// A player delivering video frames to `sink`.
    #[must_use]
    pub fn with_video_sink(sink: Box<dyn VideoSink>) -> Self {
        RetroPlayer {
            shared: Arc::new(PlayerShared {
                client: Mutex::new(None),
                play_speed: AtomicI32::new(PLAYSPEED_NORMAL),
                stop: Mutex::new(Arc::new(AtomicBool::new(true))),
                wake_mutex: Mutex::new(()),
                wake: Condvar::new(),
                audio: Mutex::new(PlayerAudio::new()),
                video: Mutex::new(PlayerVideo::new(sink)),
            }),
            transition: Mutex::new(()),
            thread: Mutex::new(None),
        }
    }

    /// Open `path` in `session` and start the playback thread.
    ///
    /// Returns false when the session refuses the file; nothing is mutated
    /// and no thread is started in that case. An already-playing session is
    /// closed first.
    pub fn open_file(&self, session: Box<dyn GameSession>, path: &str, options: PlayerOptions) -> bool {
        let _transition = self.transition.lock();
        log::info!("RetroPlayer: opening {path}");

        self.close_file_locked();

        let mut client = GameClient::new(session);
        if let Err(err) = client.open_file(path) {
            log::error!("RetroPlayer: failed to open {path}: {err}");
            return false;
        }

        let client = Arc::new(Mutex::new(client));
        *self.shared.client.lock() = Some(Arc::clone(&client));

        let stop = Arc::new(AtomicBool::new(false));
        *self.shared.stop.lock() = Arc::clone(&stop);

        let speed = if options.start_paused {
            PLAYSPEED_PAUSED
        } else {
            PLAYSPEED_NORMAL
        };
        self.shared.play_speed.store(speed, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let handle = thread::spawn(move || playback_loop(&shared, &client, &stop));
        *self.thread.lock() = Some(handle);

        log::debug!("RetroPlayer: file opened successfully");
        true
    }

    /// Stop playback and release the session.
    ///
    /// Idempotent; a second call returns true without touching anything.
    /// The stop is advisory and this never blocks on a hung core: the
    /// playback thread observes the flag within one frame (immediately when
    /// paused) and closes the session on its way out.
    pub fn close_file(&self) -> bool {
        let _transition = self.transition.lock();
        self.close_file_locked()
    }

    fn close_file_locked(&self) -> bool {
        let Some(client) = self.shared.client.lock().take() else {
            return true; // Already closed
        };
        drop(client);
        log::debug!("RetroPlayer: closing file");

        self.shared
            .play_speed
            .store(PLAYSPEED_NORMAL, Ordering::SeqCst);
        self.shared.stop.lock().store(true, Ordering::SeqCst);
        self.shared.wake();

        self.shared.audio.lock().stop();
        self.shared.video.lock().stop();

        // Detach rather than join: the loop polls the stop flag
        let _ = self.thread.lock().take();

        log::debug!("RetroPlayer: file closed");
        true
    }

    /// Whether a session is open and not stopped.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        !self.shared.stop.lock().load(Ordering::SeqCst) && self.shared.client.lock().is_some()
    }

    /// Toggle between paused and normal speed.
    pub fn pause(&self) {
        if self
            .shared
            .play_speed
            .compare_exchange(
                PLAYSPEED_PAUSED,
                PLAYSPEED_NORMAL,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            self.shared.wake();
        } else {
            self.shared
                .play_speed
                .store(PLAYSPEED_PAUSED, Ordering::SeqCst);
        }
    }

    /// Whether the effective speed is zero.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.speed() == PLAYSPEED_PAUSED
    }

    /// Current play speed in 1000-based units.
    #[must_use]
    pub fn speed(&self) -> i32 {
        self.shared.play_speed.load(Ordering::SeqCst)
    }

    /// Set the play speed to `multiplier` times normal.
    ///
    /// Negative multipliers rewind. A paused session resumes unless the
    /// multiplier is zero.
    pub fn set_speed(&self, multiplier: i32) {
        let unpause = self.speed() == PLAYSPEED_PAUSED && multiplier != PLAYSPEED_PAUSED;

        self.shared
            .play_speed
            .store(multiplier.saturating_mul(PLAYSPEED_NORMAL), Ordering::SeqCst);

        if unpause {
            self.shared.wake();
        }
    }

    /// Seek backward by a small or large step.
    ///
    /// Forward seeking is unsupported: the core cannot fast-forward through
    /// un-replayed state, so forward requests are ignored.
    pub fn seek(&self, forward: bool, large_step: bool) {
        if forward {
            return;
        }
        if !self.is_playing() {
            return;
        }

        let Some(client) = self.current_client() else {
            return;
        };
        let mut client = client.lock();

        let seconds = if large_step {
            SEEK_SECONDS_LARGE
        } else {
            SEEK_SECONDS_SMALL
        };
        let frames = (f64::from(seconds) * client.frame_rate()) as usize;
        let rewound = client.rewind_frames(frames);
        log::debug!("RetroPlayer: seek rewound {rewound} of {frames} frames");
    }

    /// Rewind so the buffer sits at `percent` of its capacity.
    pub fn seek_percent(&self, percent: f32) {
        let Some(client) = self.current_client() else {
            return;
        };
        let mut client = client.lock();

        let max_frames = client.max_frames();
        if max_frames == 0 {
            return; // Rewind not supported for this game
        }

        let percent = percent.clamp(0.0, 100.0);
        let target = (max_frames as f32 * percent / 100.0) as usize;
        let available = client.frames_available();

        if available > target {
            client.rewind_frames(available - target);
        }
    }

    /// Rewind-buffer fill as a percentage.
    #[must_use]
    pub fn percentage(&self) -> f32 {
        let Some(client) = self.current_client() else {
            return 0.0;
        };
        let client = client.lock();

        let max_frames = client.max_frames();
        if max_frames == 0 {
            return 0.0;
        }
        100.0 * client.frames_available() as f32 / max_frames as f32
    }

    /// Replayable time currently buffered, in milliseconds.
    #[must_use]
    pub fn current_time_ms(&self) -> i64 {
        let Some(client) = self.current_client() else {
            return 0;
        };
        let client = client.lock();

        let frame_rate = client.frame_rate();
        if frame_rate <= 0.0 {
            return 0;
        }
        (1000.0 * client.frames_available() as f64 / frame_rate) as i64
    }

    /// Replayable time at full buffer, in milliseconds.
    #[must_use]
    pub fn total_time_ms(&self) -> i64 {
        let Some(client) = self.current_client() else {
            return 0;
        };
        let client = client.lock();

        let frame_rate = client.frame_rate();
        if frame_rate <= 0.0 {
            return 0;
        }
        (1000.0 * client.max_frames() as f64 / frame_rate) as i64
    }

    fn current_client(&self) -> Option<Arc<Mutex<GameClient>>> {
        self.shared.client.lock().clone()
    }
}

impl Default for RetroPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RetroPlayer {
    fn drop(&mut self) {
        self.close_file();
    }
}

/// Sink handed to the session each frame; locks the player components only
/// for the duration of each delivery.
struct SharedAvSink<'a> {
    shared: &'a PlayerShared,
}

impl AvSink for SharedAvSink<'_> {
    fn video_frame(&mut self, data: &[u8], width: u32, height: u32, format: PixelFormat) {
        self.shared.video.lock().frame(data, width, height, format);
    }

    fn audio_frames(&mut self, data: &[i16], frames: usize, format: SampleFormat) {
        self.shared.audio.lock().frames(data, frames, format);
    }
}

fn playback_loop(shared: &PlayerShared, client: &Arc<Mutex<GameClient>>, stop: &AtomicBool) {
    // Sync the video clock to the audio: the stream's actual rate scales the
    // framerate used for pacing
    let reported_rate = client.lock().sample_rate();
    let correction = shared.audio.lock().start(reported_rate);
    client.lock().set_frame_rate_correction(correction);

    let frame_rate = client.lock().frame_rate();
    if correction == 1.0 {
        log::debug!("RetroPlayer: frame rate set to {frame_rate}");
    } else {
        log::debug!(
            "RetroPlayer: frame rate changed from {} to {frame_rate}",
            frame_rate / correction
        );
    }

    shared.video.lock().start(frame_rate);

    let mut clock = PlaybackClock::new(frame_rate);
    clock.reset(Instant::now());

    while !stop.load(Ordering::SeqCst) {
        let speed = shared.play_speed.load(Ordering::SeqCst);

        if speed == PLAYSPEED_PAUSED {
            // The absence of frames pauses audio and video; the failsafe
            // poll covers a missed wake signal
            {
                let mut guard = shared.wake_mutex.lock();
                shared.wake.wait_for(&mut guard, PAUSE_FAILSAFE);
            }
            if stop.load(Ordering::SeqCst) {
                break;
            }
            clock.reset(Instant::now());
            continue;
        }

        {
            let mut client = client.lock();

            if speed < PLAYSPEED_PAUSED {
                // Step back two frames so the forward step below lands one
                // frame earlier than the last visible frame
                client.rewind_frames(2);
            }

            let mut av = SharedAvSink { shared };
            client.run_frame(&mut av);
        }

        let deadline = clock.next_deadline(Instant::now(), speed);
        wait_until(shared, stop, deadline);
    }

    client.lock().close_file();
    log::debug!("RetroPlayer: playback thread exiting");
}

/// Block until `deadline` or a stop request, whichever comes first.
fn wait_until(shared: &PlayerShared, stop: &AtomicBool, deadline: Instant) {
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let now = Instant::now();
        let Some(remaining) = deadline.checked_duration_since(now).filter(|d| !d.is_zero())
        else {
            return;
        };

        let mut guard = shared.wake_mutex.lock();
        shared.wake.wait_for(&mut guard, remaining);
    }
}
