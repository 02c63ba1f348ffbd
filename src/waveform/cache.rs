// Waveform cache - Fixed-resolution display points for a sample buffer

use super::buffer::SampleBuffer;

/// Largest positive 16-bit sample, maps to a full track height
pub const MAX_SAMPLE_VALUE: f64 = 32767.0;

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Display points relative to the fragment's top-left corner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformCache {
    points: Vec<(f64, f64)>,
}

impl WaveformCache {
    /// Resample `buffer` into exactly `point_count` points
    ///
    /// Point `i` reads the nearest sample at `round(lerp(0, len, i / N))` and maps it into
    /// a band of `height` pixels centred on `height / 2`.
    pub fn compute(buffer: &SampleBuffer, point_count: usize, width: f64, height: f64) -> Self {
        let samples = buffer.samples();
        let y_offset = height / 2.0;
        let len = samples.len();

        let points = (0..point_count)
            .map(|i| {
                let t = i as f64 / point_count as f64;
                let x = lerp(0.0, width, t);
                let y = if len == 0 {
                    y_offset
                } else {
                    let index = (lerp(0.0, len as f64, t).round() as usize).min(len - 1);
                    samples[index] as f64 * height / MAX_SAMPLE_VALUE + y_offset
                };
                (x, y)
            })
            .collect();

        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Absolute polyline for a fragment whose top-left corner is at (`x`, `y`)
    pub fn translated(&self, x: f64, y: f64) -> Vec<(f64, f64)> {
        self.points.iter().map(|&(px, py)| (px + x, py + y)).collect()
    }
}
