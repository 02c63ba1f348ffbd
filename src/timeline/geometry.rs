// Timeline geometry - Pixel <-> time mapping and the BPM grid
//
// Times are stored, pixels are derived. Changing the scale or the start line never
// touches a stored time; everything on screen is recomputed from it.

use super::tempo::{MAX_BPM, MIN_BPM, Tempo};
use crate::config::SequencerConfig;

const DEFAULT_MIN_PIXELS_PER_SECOND: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Expected a finite number, got {0}")]
    NonFinite(f64),

    #[error("Tempo must be between {} and {} BPM, got {0}", MIN_BPM, MAX_BPM)]
    TempoOutOfRange(u32),
}

/// Horizontal layout of the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineGeometry {
    pixels_per_second: f64,
    min_pixels_per_second: f64,
    zoom_step: f64,
    /// X of the start line (time 0)
    left_padding: f64,
    tempo: Tempo,
}

impl TimelineGeometry {
    pub fn new(pixels_per_second: f64, left_padding: f64, tempo: Tempo) -> Self {
        Self {
            pixels_per_second: pixels_per_second.max(DEFAULT_MIN_PIXELS_PER_SECOND),
            min_pixels_per_second: DEFAULT_MIN_PIXELS_PER_SECOND,
            zoom_step: 1.0,
            left_padding,
            tempo,
        }
    }

    pub fn from_config(config: &SequencerConfig) -> Result<Self, GeometryError> {
        let tempo = Tempo::new(config.bpm)?;
        let mut geometry = Self {
            pixels_per_second: config.pixels_per_second,
            min_pixels_per_second: config.min_pixels_per_second,
            zoom_step: config.zoom_step,
            left_padding: config.left_padding,
            tempo,
        };
        geometry.set_pixels_per_second(config.pixels_per_second)?;
        Ok(geometry)
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn min_pixels_per_second(&self) -> f64 {
        self.min_pixels_per_second
    }

    pub fn left_padding(&self) -> f64 {
        self.left_padding
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn time_to_x(&self, time: f64) -> f64 {
        self.left_padding + time * self.pixels_per_second
    }

    /// Inverse of [`time_to_x`](Self::time_to_x); 0 if the scale is not positive
    pub fn x_to_time(&self, x: f64) -> f64 {
        if self.pixels_per_second <= 0.0 {
            return 0.0;
        }
        (x - self.left_padding) / self.pixels_per_second
    }

    /// Width in pixels of `duration` seconds, truncated to whole pixels
    pub fn width_of(&self, duration: f64) -> f64 {
        (duration * self.pixels_per_second).trunc()
    }

    pub fn set_left_padding(&mut self, left_padding: f64) -> Result<(), GeometryError> {
        if !left_padding.is_finite() {
            return Err(GeometryError::NonFinite(left_padding));
        }
        self.left_padding = left_padding;
        Ok(())
    }

    /// Set the scale, clamped to the minimum
    pub fn set_pixels_per_second(&mut self, value: f64) -> Result<(), GeometryError> {
        if !value.is_finite() {
            return Err(GeometryError::NonFinite(value));
        }
        self.pixels_per_second = value.max(self.min_pixels_per_second);
        Ok(())
    }

    pub fn zoom_in(&mut self) {
        self.pixels_per_second += self.zoom_step;
    }

    pub fn zoom_out(&mut self) {
        self.pixels_per_second = (self.pixels_per_second - self.zoom_step).max(self.min_pixels_per_second);
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
    }

    /// Pixels between two beat lines
    pub fn bpm_grid_spacing(&self) -> f64 {
        self.pixels_per_second / self.tempo.beats_per_second()
    }

    /// X of every visible beat line: right of the start line, inside `0..canvas_width`
    pub fn bpm_grid_lines(&self, canvas_width: f64) -> Vec<f64> {
        let spacing = self.bpm_grid_spacing();
        if spacing <= 0.0 || !spacing.is_finite() || !canvas_width.is_finite() {
            return Vec::new();
        }

        // Beats left of the canvas edge are skipped, not walked
        let first = (-self.left_padding / spacing).ceil().max(0.0);
        let last = ((canvas_width - self.left_padding) / spacing).ceil();
        if last <= first {
            return Vec::new();
        }

        (first as u64..last as u64)
            .map(|beat| self.left_padding + beat as f64 * spacing)
            .filter(|&x| x < canvas_width)
            .collect()
    }

    /// Label of the scale, e.g. `10px/sec`
    pub fn scale_label(&self) -> String {
        format!("{}px/sec", self.pixels_per_second)
    }
}

impl Default for TimelineGeometry {
    fn default() -> Self {
        Self::new(10.0, 200.0, Tempo::default())
    }
}

/// Play position label, e.g. `1min 5.250sec`
pub fn format_play_position(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{}min {:.3}sec", minutes as u64, seconds - minutes * 60.0)
}
