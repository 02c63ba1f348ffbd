// Waveform store - Decoding and display caches

pub mod buffer;
pub mod cache;
pub mod source;

pub use buffer::{SampleBuffer, display_name};
pub use cache::WaveformCache;
pub use source::{DecodeError, SampleSource, SourceSpec, WavSource};
