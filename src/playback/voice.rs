// Playback voice - Threaded output loop for one sample buffer
//
// Each `play` opens its own sink and spawns a named thread that streams the buffer
// in fixed-size chunks. Control happens through atomics only: the thread polls
// them between chunks, so stopping takes effect at the next chunk boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::metering::{apply_gain, chunk_decibel};
use crate::audio::output::{AudioBackend, AudioDeviceError, OutputFormat, OutputSink};
use crate::audio::parameters::AtomicF32;
use crate::waveform::SampleBuffer;

/// State shared between a voice and its output thread
struct VoiceShared {
    /// Generation of the live loop, 0 when stopped
    active: AtomicU64,
    /// Last generation handed out
    generation: AtomicU64,
    /// Output threads not yet finished (including superseded ones)
    running: AtomicUsize,
    gain: AtomicF32,
    decibel: AtomicF32,
}

/// Streams one [`SampleBuffer`] to the audio backend
///
/// At most one loop is live per voice. A superseded thread (stopped, then replayed
/// before it noticed) finishes its current chunk and exits without touching the
/// state of the newer loop.
pub struct PlaybackVoice {
    buffer: Arc<SampleBuffer>,
    backend: Arc<dyn AudioBackend>,
    chunk_frames: usize,
    shared: Arc<VoiceShared>,
}

impl PlaybackVoice {
    pub fn new(buffer: Arc<SampleBuffer>, backend: Arc<dyn AudioBackend>, chunk_frames: usize) -> Self {
        Self {
            buffer,
            backend,
            chunk_frames: chunk_frames.max(1),
            shared: Arc::new(VoiceShared {
                active: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                running: AtomicUsize::new(0),
                gain: AtomicF32::new(1.0),
                decibel: AtomicF32::new(f32::NEG_INFINITY),
            }),
        }
    }

    /// Start streaming from `seek` seconds into the buffer
    ///
    /// Does nothing if the voice is already playing. The sink is opened before the
    /// thread starts, so a device failure is returned here and the voice stays stopped.
    pub fn play(&self, seek: f64) -> Result<(), AudioDeviceError> {
        if self.is_playing() {
            return Ok(());
        }

        let format = OutputFormat::pcm16(self.buffer.channels(), self.buffer.frame_rate());
        let sink = self.backend.open(format)?;

        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.active.store(generation, Ordering::Release);
        self.shared.running.fetch_add(1, Ordering::AcqRel);

        let start_frame = seek_to_frame(seek, self.buffer.frame_rate());
        let buffer = Arc::clone(&self.buffer);
        let shared = Arc::clone(&self.shared);
        let chunk_frames = self.chunk_frames;

        let spawned = thread::Builder::new()
            .name(format!("voice-{}", self.buffer.name()))
            .spawn(move || {
                run_voice(&buffer, &shared, sink, generation, start_frame, chunk_frames);
                shared.running.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            let _ = self.shared.active.compare_exchange(
                generation,
                0,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            self.shared.running.fetch_sub(1, Ordering::AcqRel);
            return Err(AudioDeviceError::StreamOpen(e.to_string()));
        }

        Ok(())
    }

    /// Ask the output loop to finish; the current chunk may still be heard
    pub fn stop(&self) {
        self.shared.active.store(0, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.active.load(Ordering::Acquire) != 0
    }

    /// Set the linear gain; negative values become 0
    pub fn set_gain(&self, gain: f32) {
        let gain = if gain.is_nan() { 0.0 } else { gain.max(0.0) };
        self.shared.gain.set(gain);
    }

    pub fn gain(&self) -> f32 {
        self.shared.gain.get()
    }

    /// Level of the last chunk written, negative infinity before any output
    pub fn current_decibel(&self) -> f32 {
        self.shared.decibel.get()
    }

    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    /// Block until no output thread of this voice is left, or `timeout` elapses
    ///
    /// Returns `true` when the voice is fully stopped.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_playing() && self.shared.running.load(Ordering::Acquire) == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for PlaybackVoice {
    fn drop(&mut self) {
        self.stop();
    }
}

fn seek_to_frame(seek: f64, frame_rate: u32) -> usize {
    if !seek.is_finite() || seek <= 0.0 {
        return 0;
    }
    (seek * frame_rate as f64).round() as usize
}

fn run_voice(
    buffer: &SampleBuffer,
    shared: &VoiceShared,
    mut sink: Box<dyn OutputSink>,
    generation: u64,
    start_frame: usize,
    chunk_frames: usize,
) {
    log::debug!(
        "Voice {} started at frame {} (generation {})",
        buffer.name(),
        start_frame,
        generation
    );

    let mut frame = start_frame;
    let mut scaled = Vec::with_capacity(chunk_frames * buffer.channels() as usize);
    let mut exhausted = false;

    while shared.active.load(Ordering::Acquire) == generation {
        let chunk = buffer.frames(frame, chunk_frames);
        if chunk.is_empty() {
            exhausted = true;
            break;
        }

        apply_gain(chunk, shared.gain.get(), &mut scaled);
        if let Err(e) = sink.write(&scaled) {
            log::warn!("Voice {} lost its output: {}", buffer.name(), e);
            break;
        }
        shared.decibel.set(chunk_decibel(&scaled) as f32);
        frame += chunk_frames;
    }

    // Only a finished buffer is played out; a stopped voice goes quiet at once
    if exhausted {
        sink.close();
    } else {
        sink.abort();
    }

    // A newer play owns the flag if the generation moved on
    let _ = shared
        .active
        .compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire);

    log::debug!("Voice {} finished at frame {}", buffer.name(), frame);
}
