// Fragment - A sound placed on the timeline
//
// A fragment owns its playback voice and a waveform cache sized for the current
// zoom. Its start is stored as a time; the x position is always derived from the
// timeline geometry.

pub mod layout;
pub mod palette;

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::audio::output::{AudioBackend, AudioDeviceError};
use crate::config::SequencerConfig;
use crate::playback::PlaybackVoice;
use crate::timeline::TimelineGeometry;
use crate::waveform::{SampleBuffer, WaveformCache};

pub use layout::{ButtonKind, FragmentLayout, LayoutInput, LayoutMetrics, Rect};
pub use palette::FragmentColor;

/// Unique fragment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(Uuid);

impl FragmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FragmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sound placed on the timeline
pub struct Fragment {
    id: FragmentId,
    buffer: Arc<SampleBuffer>,
    voice: PlaybackVoice,

    /// Seconds from the start line
    start_time: f64,
    /// Top of the body, in pixels
    track_y: f64,
    height: f64,
    min_height: f64,

    color: FragmentColor,
    mute: bool,
    solo: bool,
    selected: bool,
    label: String,
    volume: f32,

    waveform_points: usize,
    cache: WaveformCache,
    metrics: LayoutMetrics,
}

impl Fragment {
    /// New fragment at the configured default position and height
    pub fn new(
        buffer: Arc<SampleBuffer>,
        backend: Arc<dyn AudioBackend>,
        config: &SequencerConfig,
        geometry: &TimelineGeometry,
    ) -> Self {
        let voice = PlaybackVoice::new(Arc::clone(&buffer), backend, config.chunk_frames);
        let mut fragment = Self {
            id: FragmentId::new(),
            label: buffer.name().to_string(),
            buffer,
            voice,
            start_time: config.default_start_time.max(0.0),
            track_y: config.default_track_y,
            height: config.default_track_height.max(config.min_track_height),
            min_height: config.min_track_height,
            color: FragmentColor::default(),
            mute: false,
            solo: false,
            selected: false,
            volume: 1.0,
            waveform_points: config.waveform_points,
            cache: WaveformCache::default(),
            metrics: LayoutMetrics::from_config(config),
        };
        fragment.recompute_waveform_cache(geometry);
        fragment
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.move_to(start_time);
        self
    }

    pub fn with_track_y(mut self, track_y: f64) -> Self {
        self.track_y = track_y;
        self
    }

    pub fn with_color(mut self, color: FragmentColor) -> Self {
        self.color = color;
        self
    }

    // ========== Accessors ==========

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    pub fn voice(&self) -> &PlaybackVoice {
        &self.voice
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    pub fn track_y(&self) -> f64 {
        self.track_y
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn color(&self) -> FragmentColor {
        self.color
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn waveform_cache(&self) -> &WaveformCache {
        &self.cache
    }

    /// Left edge on screen
    pub fn x(&self, geometry: &TimelineGeometry) -> f64 {
        geometry.time_to_x(self.start_time)
    }

    pub fn width(&self, geometry: &TimelineGeometry) -> f64 {
        geometry.width_of(self.duration())
    }

    // ========== Placement ==========

    /// Move the start to `start_time`; negative times clamp to 0
    pub fn move_to(&mut self, start_time: f64) {
        self.start_time = if start_time.is_finite() {
            start_time.max(0.0)
        } else {
            0.0
        };
    }

    /// Move the body's left edge to screen `x` (drag)
    pub fn move_to_x(&mut self, x: f64, geometry: &TimelineGeometry) {
        self.move_to(geometry.x_to_time(x));
    }

    pub fn nudge_vertically(&mut self, dy: f64) {
        self.track_y += dy;
    }

    /// Resize the body and rebuild the waveform for the new height
    pub fn set_track_height(&mut self, height: f64, geometry: &TimelineGeometry) {
        let height = height.max(self.min_height);
        if height != self.height {
            self.height = height;
            self.recompute_waveform_cache(geometry);
        }
    }

    /// Rebuild the waveform points for the current scale and height
    pub fn recompute_waveform_cache(&mut self, geometry: &TimelineGeometry) {
        self.cache = WaveformCache::compute(
            &self.buffer,
            self.waveform_points,
            self.width(geometry),
            self.height,
        );
    }

    // ========== State ==========

    pub fn toggle_mute(&mut self) {
        self.mute = !self.mute;
    }

    pub fn toggle_solo(&mut self) {
        self.solo = !self.solo;
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn cycle_color(&mut self) {
        self.color = self.color.next();
    }

    /// Set the volume (negative clamps to 0) and pass it on to the voice
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() { 0.0 } else { volume.max(0.0) };
        self.voice.set_gain(self.volume);
    }

    pub fn rename(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Gain the voice should use given the solo state of the whole session
    pub fn effective_gain(&self, any_solo: bool) -> f32 {
        if self.mute || (any_solo && !self.solo) {
            0.0
        } else {
            self.volume
        }
    }

    /// Push [`effective_gain`](Self::effective_gain) to the voice
    pub fn apply_gain(&self, any_solo: bool) {
        self.voice.set_gain(self.effective_gain(any_solo));
    }

    /// True while `time` lies in `[start, start + duration)`
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    // ========== Playback ==========

    /// Play from `seek` seconds into the sound; no effect if already playing
    pub fn play(&self, seek: f64) -> Result<(), AudioDeviceError> {
        self.voice.play(seek)
    }

    pub fn stop(&self) {
        self.voice.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_playing()
    }

    // ========== Layout ==========

    pub fn layout(&self, geometry: &TimelineGeometry) -> FragmentLayout {
        let x = self.x(geometry);
        let input = LayoutInput {
            x,
            y: self.track_y,
            width: self.width(geometry),
            height: self.height,
            mute: self.mute,
            solo: self.solo,
            selected: self.selected,
            volume: self.volume,
            label: &self.label,
        };
        FragmentLayout::compute(input, self.metrics, self.cache.translated(x, self.track_y))
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("start_time", &self.start_time)
            .field("track_y", &self.track_y)
            .field("height", &self.height)
            .field("color", &self.color)
            .field("mute", &self.mute)
            .field("solo", &self.solo)
            .field("selected", &self.selected)
            .field("volume", &self.volume)
            .finish()
    }
}
