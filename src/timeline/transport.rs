// Transport - Play/stop state and wall-clock playhead
//
// While playing, the position is derived from the clock on every read:
// `elapsed = now - wall_clock_start + seek_offset`. Nothing accumulates, so the
// position cannot drift with the tick rate.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of wall-clock time for the transport
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock advanced by hand
///
/// Clones share the same time, so a test can keep one and give the other to a
/// session.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset_micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_micros: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_micros
            .fetch_add(by.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn advance_secs(&self, seconds: f64) {
        self.advance(Duration::from_secs_f64(seconds.max(0.0)));
    }

    /// Time since the clock was created
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.offset_micros.load(Ordering::Relaxed))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

/// Transport state (play/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Transport driven by a [`Clock`]
#[derive(Debug)]
pub struct Transport<C: Clock> {
    clock: C,
    state: TransportState,
    wall_clock_start: Option<Instant>,
    seek_offset: f64,
}

impl<C: Clock> Transport<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: TransportState::Stopped,
            wall_clock_start: None,
            seek_offset: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Position the playhead started from
    pub fn seek_offset(&self) -> f64 {
        self.seek_offset
    }

    /// Start playing from `seek` seconds; no effect if already playing
    pub fn start(&mut self, seek: f64) {
        if self.state.is_playing() {
            return;
        }
        self.state = TransportState::Playing;
        self.wall_clock_start = Some(self.clock.now());
        self.seek_offset = seek.max(0.0);
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.wall_clock_start = None;
    }

    /// Current playhead in seconds, `None` while stopped
    pub fn elapsed(&self) -> Option<f64> {
        let start = self.wall_clock_start?;
        let now = self.clock.now();
        Some(now.saturating_duration_since(start).as_secs_f64() + self.seek_offset)
    }
}
