// Format conversion - 16-bit PCM to CPAL device samples
//
// Voices produce interleaved i16 frames in the source's channel layout. The device
// stream may use another sample type (f32, i16, u16) and another channel count, so
// each source frame is mapped onto one device frame here. All conversions are
// allocation-free and safe to call from the audio callback.

use cpal::{FromSample, Sample};

/// Convert i16 sample to f32
///
/// Maps [i16::MIN, i16::MAX] to [-1.0, 1.0]
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    if sample >= 0 {
        sample as f32 / i16::MAX as f32
    } else {
        sample as f32 / -(i16::MIN as f32)
    }
}

/// Write one source frame into one interleaved device frame
///
/// - same layout: copied channel by channel
/// - mono source: duplicated on every device channel
/// - mono device: source channels averaged
/// - otherwise: shared channels copied, extra device channels silent
#[inline]
pub fn write_pcm_frame<T>(source_frame: &[i16], output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    match (source_frame.len(), output_frame.len()) {
        (0, _) => {
            for out in output_frame.iter_mut() {
                *out = T::EQUILIBRIUM;
            }
        }
        (1, _) => {
            let value = i16_to_f32(source_frame[0]);
            for out in output_frame.iter_mut() {
                *out = Sample::from_sample::<f32>(value);
            }
        }
        (n, 1) => {
            let sum: f32 = source_frame.iter().map(|&s| i16_to_f32(s)).sum();
            output_frame[0] = Sample::from_sample::<f32>(sum / n as f32);
        }
        _ => {
            for (i, out) in output_frame.iter_mut().enumerate() {
                *out = match source_frame.get(i) {
                    Some(&s) => Sample::from_sample::<f32>(i16_to_f32(s)),
                    None => T::EQUILIBRIUM,
                };
            }
        }
    }
}
