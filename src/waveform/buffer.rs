// Sample buffer - Immutable decoded PCM for one source file

use super::source::{DecodeError, SampleSource, WavSource};
use std::path::{Path, PathBuf};

/// Frames pulled from the decoder per read while loading
pub const LOAD_CHUNK_FRAMES: usize = 255;

/// Decoded 16-bit PCM, interleaved
///
/// Never mutated after construction; voices and fragments share it through an `Arc`.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<i16>,
    frame_rate: u32,
    channels: u16,
    sample_width: u16,
    name: String,
    path: Option<PathBuf>,
}

impl SampleBuffer {
    /// Decode a WAV file eagerly
    pub fn load(path: &Path) -> Result<Self, DecodeError> {
        let mut source = WavSource::open(path)?;
        let mut buffer = Self::from_source(&mut source, &display_name(path))?;
        buffer.path = Some(path.to_path_buf());
        log::info!(
            "Loaded {} ({} frames, {} Hz, {} ch, {:.3}s)",
            path.display(),
            buffer.frame_count(),
            buffer.frame_rate,
            buffer.channels,
            buffer.duration()
        );
        Ok(buffer)
    }

    /// Drain a sample source into a buffer
    pub fn from_source(source: &mut dyn SampleSource, name: &str) -> Result<Self, DecodeError> {
        let spec = source.spec();
        if spec.frame_rate == 0 || spec.channels == 0 {
            return Err(DecodeError::Empty(format!(
                "{}: {} Hz, {} channels",
                name, spec.frame_rate, spec.channels
            )));
        }

        let channels = spec.channels as usize;
        let mut samples = Vec::with_capacity(spec.frame_count as usize * channels);
        loop {
            let chunk = source.read_frames(LOAD_CHUNK_FRAMES)?;
            if chunk.is_empty() {
                break;
            }
            samples.extend_from_slice(&chunk);
        }

        // A trailing partial frame cannot be played back
        let whole = samples.len() - samples.len() % channels;
        samples.truncate(whole);

        Ok(Self {
            samples,
            frame_rate: spec.frame_rate,
            channels: spec.channels,
            sample_width: spec.sample_width,
            name: name.to_string(),
            path: None,
        })
    }

    /// Build a buffer from samples already in memory
    pub fn from_samples(samples: Vec<i16>, frame_rate: u32, channels: u16) -> Self {
        assert!(frame_rate > 0, "Frame rate must be > 0");
        assert!(channels > 0, "Channel count must be > 0");
        Self {
            samples,
            frame_rate,
            channels,
            sample_width: 2,
            name: String::new(),
            path: None,
        }
    }

    /// Rename a buffer (builder style)
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes per sample in the source container
    pub fn sample_width(&self) -> u16 {
        self.sample_width
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.frame_rate as f64
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Interleaved samples of `frames` frames starting at `start_frame`
    ///
    /// Shorter (or empty) at the end of the buffer.
    pub fn frames(&self, start_frame: usize, frames: usize) -> &[i16] {
        let channels = self.channels as usize;
        let start = start_frame.saturating_mul(channels).min(self.samples.len());
        let end = start
            .saturating_add(frames.saturating_mul(channels))
            .min(self.samples.len());
        &self.samples[start..end]
    }
}

/// Track label derived from a file name: upper-cased stem
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_uppercase()
}
