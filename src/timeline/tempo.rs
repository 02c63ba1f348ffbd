// Tempo - Beats per minute for the visual beat grid

use std::fmt;

use super::geometry::GeometryError;

pub const MIN_BPM: u32 = 20;
pub const MAX_BPM: u32 = 999;

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    bpm: u32,
}

impl Tempo {
    /// Creates a new tempo within `MIN_BPM..=MAX_BPM`
    pub fn new(bpm: u32) -> Result<Self, GeometryError> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(GeometryError::TempoOutOfRange(bpm));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    pub fn beats_per_second(&self) -> f64 {
        self.bpm as f64 / 60.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 110 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_creation() {
        let tempo = Tempo::new(120).unwrap();
        assert_eq!(tempo.bpm(), 120);
        assert_eq!(tempo.beat_duration_seconds(), 0.5);
        assert_eq!(tempo.beats_per_second(), 2.0);
        assert_eq!(Tempo::default().bpm(), 110);
    }

    #[test]
    fn test_tempo_range() {
        assert_eq!(Tempo::new(0), Err(GeometryError::TempoOutOfRange(0)));
        assert_eq!(Tempo::new(19), Err(GeometryError::TempoOutOfRange(19)));
        assert_eq!(
            Tempo::new(u32::MAX),
            Err(GeometryError::TempoOutOfRange(u32::MAX))
        );
        assert_eq!(Tempo::new(MIN_BPM).unwrap().bpm(), 20);
        assert_eq!(Tempo::new(MAX_BPM).unwrap().bpm(), 999);
    }

    #[test]
    fn test_tempo_label() {
        assert_eq!(Tempo::new(110).unwrap().to_string(), "110 BPM");
    }
}
