// Configuration - Tunable constants of the sequencer
// Loaded from a RON file, every field falls back to its default

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::timeline::tempo::{MAX_BPM, MIN_BPM};

const CONFIG_DIR: &str = "jupiter";
const CONFIG_FILE: &str = "config.ron";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Sequencer configuration
///
/// Pixel values are screen pixels, times are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Distance between the canvas edge and the timeline zero point
    pub left_padding: f64,
    /// Initial horizontal scale
    pub pixels_per_second: f64,
    /// Lower bound for the horizontal scale
    pub min_pixels_per_second: f64,
    /// Scale change per zoom step
    pub zoom_step: f64,
    /// Initial tempo
    pub bpm: u32,
    /// Number of points in every waveform cache
    pub waveform_points: usize,
    /// Frames written to the output per playback chunk
    pub chunk_frames: usize,
    pub default_track_height: f64,
    pub min_track_height: f64,
    pub track_height_step: f64,
    /// Vertical offset applied by one "move selection" key press
    pub vertical_nudge: f64,
    /// Timeline position of freshly opened fragments
    pub default_start_time: f64,
    pub default_track_y: f64,
    /// Size of the per-fragment mute/solo/colour/volume buttons
    pub button_size: f64,
    /// Gap between a selected fragment and its selection mark
    pub selection_padding: f64,
    /// Spacing of the background track grid
    pub track_spacing: f64,
    /// Period of the transport tick in the headless player
    pub tick_interval_ms: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            left_padding: 200.0,
            pixels_per_second: 10.0,
            min_pixels_per_second: 5.0,
            zoom_step: 1.0,
            bpm: 110,
            waveform_points: 400,
            chunk_frames: 255,
            default_track_height: 25.0,
            min_track_height: 5.0,
            track_height_step: 5.0,
            vertical_nudge: 5.0,
            default_start_time: 1.0,
            default_track_y: 25.0,
            button_size: 25.0,
            selection_padding: 15.0,
            track_spacing: 40.0,
            tick_interval_ms: 1,
        }
    }
}

impl SequencerConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: SequencerConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Resolve the configuration to use
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// used when present, defaults otherwise.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::info!("Loading configuration from {}", path.display());
            return Self::load_from_file(path);
        }

        match Self::user_config_path() {
            Some(path) if path.exists() => {
                log::info!("Loading configuration from {}", path.display());
                Self::load_from_file(&path)
            }
            _ => {
                log::debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/jupiter/config.ron`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject values that would break geometry or playback
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pixels_per_second", self.pixels_per_second),
            ("min_pixels_per_second", self.min_pixels_per_second),
            ("zoom_step", self.zoom_step),
            ("default_track_height", self.default_track_height),
            ("min_track_height", self.min_track_height),
            ("track_spacing", self.track_spacing),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !self.left_padding.is_finite() {
            return Err(ConfigError::Invalid("left_padding must be finite".to_string()));
        }
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(ConfigError::Invalid(format!(
                "bpm must be between {} and {}, got {}",
                MIN_BPM, MAX_BPM, self.bpm
            )));
        }
        if self.waveform_points == 0 {
            return Err(ConfigError::Invalid("waveform_points must be > 0".to_string()));
        }
        if self.chunk_frames == 0 {
            return Err(ConfigError::Invalid("chunk_frames must be > 0".to_string()));
        }
        if self.default_start_time < 0.0 {
            return Err(ConfigError::Invalid(
                "default_start_time must be >= 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SequencerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.left_padding, 200.0);
        assert_eq!(config.waveform_points, 400);
        assert_eq!(config.chunk_frames, 255);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = SequencerConfig::default();
        let text = config.to_ron().unwrap();
        let parsed = SequencerConfig::from_ron(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let parsed = SequencerConfig::from_ron("(bpm: 140, pixels_per_second: 20.0)").unwrap();
        assert_eq!(parsed.bpm, 140);
        assert_eq!(parsed.pixels_per_second, 20.0);
        assert_eq!(parsed.left_padding, 200.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SequencerConfig::from_ron("(bpm: 0)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SequencerConfig::from_ron("(pixels_per_second: -1.0)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SequencerConfig::from_ron("(bpm: 1000)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SequencerConfig::from_ron("(waveform_points: 0)"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            SequencerConfig::from_ron("(bpm: \"fast\""),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(&path, "(left_padding: 120.0)").unwrap();

        let config = SequencerConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.left_padding, 120.0);

        let missing = dir.path().join("missing.ron");
        assert!(matches!(
            SequencerConfig::resolve(Some(&missing)),
            Err(ConfigError::Io(_))
        ));
    }
}
