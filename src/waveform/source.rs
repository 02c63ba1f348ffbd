// Sample sources - Decode collaborator
// Everything that can hand out 16-bit PCM frames implements SampleSource

use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Decode error types
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed audio data: {0}")]
    Malformed(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Source contains no audio: {0}")]
    Empty(String),
}

impl From<hound::Error> for DecodeError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => DecodeError::Io(e),
            hound::Error::Unsupported => {
                DecodeError::UnsupportedFormat("unsupported WAV feature".to_string())
            }
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

/// Container metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub frame_rate: u32,
    pub channels: u16,
    /// Bytes per sample as stored in the container
    pub sample_width: u16,
    pub frame_count: u64,
}

/// Cursor over decoded PCM
pub trait SampleSource {
    fn spec(&self) -> SourceSpec;

    /// Read up to `frames` frames as interleaved i16 samples, advancing the cursor
    ///
    /// Returns an empty vector once the source is exhausted.
    fn read_frames(&mut self, frames: usize) -> Result<Vec<i16>, DecodeError>;
}

/// WAV file source backed by hound
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: SourceSpec,
    format: SampleFormat,
    bits_per_sample: u16,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let reader = WavReader::open(path)?;
        let wav_spec = reader.spec();

        match (wav_spec.sample_format, wav_spec.bits_per_sample) {
            (SampleFormat::Int, 8 | 16 | 24 | 32) | (SampleFormat::Float, 32) => {}
            (format, bits) => {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "{:?} {}-bit",
                    format, bits
                )));
            }
        }

        let spec = SourceSpec {
            frame_rate: wav_spec.sample_rate,
            channels: wav_spec.channels,
            sample_width: wav_spec.bits_per_sample.div_ceil(8),
            frame_count: reader.duration() as u64,
        };

        Ok(Self {
            reader,
            spec,
            format: wav_spec.sample_format,
            bits_per_sample: wav_spec.bits_per_sample,
        })
    }
}

impl SampleSource for WavSource {
    fn spec(&self) -> SourceSpec {
        self.spec
    }

    fn read_frames(&mut self, frames: usize) -> Result<Vec<i16>, DecodeError> {
        let count = frames * self.spec.channels as usize;

        let samples = match (self.format, self.bits_per_sample) {
            (SampleFormat::Int, 16) => self
                .reader
                .samples::<i16>()
                .take(count)
                .collect::<Result<Vec<_>, _>>()?,
            (SampleFormat::Int, bits) => {
                let shift = bits as i32 - 16;
                self.reader
                    .samples::<i32>()
                    .take(count)
                    .map(|s| s.map(|x| rescale_int(x, shift)))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (SampleFormat::Float, _) => self
                .reader
                .samples::<f32>()
                .take(count)
                .map(|s| s.map(|x| (x * i16::MAX as f32) as i16))
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(samples)
    }
}

// hound widens 8-bit unsigned data to signed values centred on zero
#[inline]
fn rescale_int(sample: i32, shift: i32) -> i16 {
    if shift >= 0 {
        (sample >> shift) as i16
    } else {
        (sample << -shift) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_wav<S: hound::Sample + Copy>(path: &Path, spec: WavSpec, samples: &[S]) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_source_16_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[1i16, -2, 3, -4, 5]);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(
            source.spec(),
            SourceSpec {
                frame_rate: 8000,
                channels: 1,
                sample_width: 2,
                frame_count: 5,
            }
        );
        assert_eq!(source.read_frames(3).unwrap(), vec![1, -2, 3]);
        assert_eq!(source.read_frames(3).unwrap(), vec![-4, 5]);
        assert!(source.read_frames(3).unwrap().is_empty());
    }

    #[test]
    fn test_wav_source_24_bit_is_rescaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[256i32, -512, 8_388_607, -8_388_608]);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.spec().sample_width, 3);
        assert_eq!(source.spec().frame_count, 2);
        assert_eq!(source.read_frames(2).unwrap(), vec![1, -2, 32767, -32768]);
    }

    #[test]
    fn test_wav_source_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        write_wav(&path, spec, &[0.0f32, 1.0, -1.0, 2.0]);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.read_frames(4).unwrap(), vec![0, 32767, -32767, 32767]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = WavSource::open(Path::new("/definitely/not/here.wav"));
        assert!(matches!(result, Err(DecodeError::Io(_))));
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"this is not a riff container").unwrap();

        let result = WavSource::open(&path);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }
}
