// Metering - RMS level and gain of PCM chunks

/// Root mean square of a chunk of 16-bit samples, in sample units
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// `20 * log10(rms)`; silence gives negative infinity
pub fn decibel(rms: f64) -> f64 {
    20.0 * rms.log10()
}

/// Level of a chunk as shown on a fragment's meter
pub fn chunk_decibel(samples: &[i16]) -> f64 {
    decibel(rms(samples))
}

/// Multiply every sample by `gain`
///
/// The product is converted back with Rust's saturating float-to-int cast, so gains
/// above 1.0 clip at the i16 range instead of wrapping around.
pub fn apply_gain(samples: &[i16], gain: f32, out: &mut Vec<i16>) {
    out.clear();
    out.extend(samples.iter().map(|&s| (s as f32 * gain) as i16));
}
