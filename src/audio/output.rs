// Audio output - Output collaborator interface
//
// A voice opens one sink per play call and writes 16-bit interleaved chunks to it.
// The backend is the process-wide device handle injected into every voice.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Audio device error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioDeviceError {
    #[error("No audio output device available")]
    NoDevice,

    #[error("Audio output device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open output stream: {0}")]
    StreamOpen(String),

    #[error("Output stream failed: {0}")]
    Stream(String),

    #[error("Audio device has been shut down")]
    ShutDown,
}

/// Layout of the PCM written to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Bytes per sample (always 2 for the i16 data voices produce)
    pub sample_width: u16,
    pub channels: u16,
    pub frame_rate: u32,
}

impl OutputFormat {
    pub fn pcm16(channels: u16, frame_rate: u32) -> Self {
        Self {
            sample_width: 2,
            channels,
            frame_rate,
        }
    }
}

/// One open output stream
pub trait OutputSink: Send {
    /// Queue interleaved samples, blocking while the device catches up
    fn write(&mut self, samples: &[i16]) -> Result<(), AudioDeviceError>;

    /// Let queued audio drain and release the stream
    fn close(&mut self);

    /// Release the stream at once, dropping whatever is still queued
    fn abort(&mut self);
}

/// Factory for output sinks
pub trait AudioBackend: Send + Sync {
    fn open(&self, format: OutputFormat) -> Result<Box<dyn OutputSink>, AudioDeviceError>;
}

#[derive(Default)]
struct MemoryState {
    streams: Vec<Arc<Mutex<Vec<i16>>>>,
    formats: Vec<OutputFormat>,
}

/// How long a memory sink blocks on each write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pacing {
    #[default]
    Immediate,
    Fixed(Duration),
    /// As long as the written frames take to play at the sink's frame rate
    RealTime,
}

impl Pacing {
    fn delay(&self, format: OutputFormat, samples: usize) -> Duration {
        match *self {
            Pacing::Immediate => Duration::ZERO,
            Pacing::Fixed(delay) => delay,
            Pacing::RealTime => {
                if format.channels == 0 || format.frame_rate == 0 {
                    return Duration::ZERO;
                }
                let frames = samples / format.channels as usize;
                Duration::from_secs_f64(frames as f64 / format.frame_rate as f64)
            }
        }
    }
}

/// In-memory backend: every sink records what it was given
///
/// Used by the tests and by headless runs without a sound card. Writes can be paced
/// to imitate a device consuming audio.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    unavailable: Arc<AtomicBool>,
    closed: Arc<AtomicUsize>,
    aborted: Arc<AtomicUsize>,
    pacing: Pacing,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `delay` on every write
    pub fn paced(delay: Duration) -> Self {
        Self {
            pacing: Pacing::Fixed(delay),
            ..Self::default()
        }
    }

    /// Block every write for the playing time of its frames
    pub fn realtime() -> Self {
        Self {
            pacing: Pacing::RealTime,
            ..Self::default()
        }
    }

    /// Make subsequent `open` calls fail as if the device were busy
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    pub fn open_count(&self) -> usize {
        self.lock_state().streams.len()
    }

    /// Sinks released so far, drained or aborted
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::Relaxed)
    }

    /// Sinks released through `abort`
    pub fn aborted_count(&self) -> usize {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Samples written to the `index`-th opened sink
    pub fn written(&self, index: usize) -> Vec<i16> {
        self.lock_state()
            .streams
            .get(index)
            .map(|s| s.lock().map(|v| v.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn format(&self, index: usize) -> Option<OutputFormat> {
        self.lock_state().formats.get(index).copied()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the recorded data from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AudioBackend for MemoryBackend {
    fn open(&self, format: OutputFormat) -> Result<Box<dyn OutputSink>, AudioDeviceError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(AudioDeviceError::StreamOpen("device busy".to_string()));
        }

        let stream = Arc::new(Mutex::new(Vec::new()));
        let mut state = self.lock_state();
        state.streams.push(Arc::clone(&stream));
        state.formats.push(format);

        Ok(Box::new(MemorySink {
            stream,
            format,
            closed: Arc::clone(&self.closed),
            aborted: Arc::clone(&self.aborted),
            pacing: self.pacing,
            is_closed: false,
        }))
    }
}

struct MemorySink {
    stream: Arc<Mutex<Vec<i16>>>,
    format: OutputFormat,
    closed: Arc<AtomicUsize>,
    aborted: Arc<AtomicUsize>,
    pacing: Pacing,
    is_closed: bool,
}

impl MemorySink {
    fn release(&mut self) -> bool {
        if self.is_closed {
            return false;
        }
        self.is_closed = true;
        self.closed.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, samples: &[i16]) -> Result<(), AudioDeviceError> {
        if self.is_closed {
            return Err(AudioDeviceError::Stream("sink closed".to_string()));
        }
        self.stream
            .lock()
            .map_err(|_| AudioDeviceError::Stream("poisoned sink".to_string()))?
            .extend_from_slice(samples);
        let delay = self.pacing.delay(self.format, samples.len());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.release();
    }

    fn abort(&mut self) {
        if self.release() {
            self.aborted.fetch_add(1, Ordering::Relaxed);
        }
    }
}
