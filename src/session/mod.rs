// Session - Fragments, timeline and transport of one arrangement
//
// The session lives on a single control thread. Voices play on their own threads,
// but every decision about what plays when is taken here, in `tick`.

pub mod command;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::output::{AudioBackend, AudioDeviceError};
use crate::config::{ConfigError, SequencerConfig};
use crate::fragment::{ButtonKind, Fragment, FragmentId};
use crate::messaging::{Notification, NotificationCategory, NotificationLog};
use crate::timeline::{
    Clock, GeometryError, SystemClock, Tempo, TimelineGeometry, Transport, TransportState,
    format_play_position,
};
use crate::waveform::{DecodeError, SampleBuffer};

pub use command::Command;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Audio device error: {0}")]
    Audio(#[from] AudioDeviceError),

    #[error("Timeline error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No fragment with id {0}")]
    UnknownFragment(FragmentId),
}

/// Outcome of [`Session::open_files`]
#[derive(Debug, Default)]
pub struct OpenReport {
    pub loaded: Vec<FragmentId>,
    pub failed: Vec<(PathBuf, DecodeError)>,
}

/// Outcome of one [`Session::tick`]
#[derive(Debug, Default)]
pub struct TickReport {
    /// Playhead in seconds, `None` while stopped
    pub elapsed: Option<f64>,
    /// Fragments whose voice was started by this tick
    pub triggered: Vec<FragmentId>,
    pub failures: Vec<(FragmentId, AudioDeviceError)>,
}

/// What a canvas click landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Background,
    Body(FragmentId),
    Button(FragmentId, ButtonKind),
}

pub struct Session<C: Clock = SystemClock> {
    config: SequencerConfig,
    backend: Arc<dyn AudioBackend>,
    geometry: TimelineGeometry,
    fragments: Vec<Fragment>,
    transport: Transport<C>,

    /// Cursor position in seconds; transport starts from here
    cursor_time: f64,
    /// X of the play line, `None` while stopped
    play_line: Option<f64>,
    status: String,
    notifications: NotificationLog,

    /// Removed fragments whose drawings have not been released yet
    released: Vec<FragmentId>,
    /// Fragments already reported as failing during the current run
    failing: HashSet<FragmentId>,
}

impl Session<SystemClock> {
    pub fn new(config: SequencerConfig, backend: Arc<dyn AudioBackend>) -> Result<Self, SessionError> {
        Self::with_clock(config, backend, SystemClock)
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(
        config: SequencerConfig,
        backend: Arc<dyn AudioBackend>,
        clock: C,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let geometry = TimelineGeometry::from_config(&config)?;

        Ok(Self {
            config,
            backend,
            geometry,
            fragments: Vec::new(),
            transport: Transport::new(clock),
            cursor_time: 0.0,
            play_line: None,
            status: String::new(),
            notifications: NotificationLog::default(),
            released: Vec::new(),
            failing: HashSet::new(),
        })
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn geometry(&self) -> &TimelineGeometry {
        &self.geometry
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id() == id)
    }

    pub fn selected_ids(&self) -> Vec<FragmentId> {
        self.fragments
            .iter()
            .filter(|f| f.is_selected())
            .map(|f| f.id())
            .collect()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn clock(&self) -> &C {
        self.transport.clock()
    }

    pub fn cursor_time(&self) -> f64 {
        self.cursor_time
    }

    pub fn cursor_x(&self) -> f64 {
        self.geometry.time_to_x(self.cursor_time)
    }

    pub fn play_line(&self) -> Option<f64> {
        self.play_line
    }

    /// Current playhead as shown on the position label
    pub fn play_position_label(&self) -> String {
        format_play_position(self.transport.elapsed().unwrap_or(self.cursor_time))
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationLog {
        &mut self.notifications
    }

    /// Ids of deleted fragments since the last call; their drawings can go
    pub fn take_released(&mut self) -> Vec<FragmentId> {
        std::mem::take(&mut self.released)
    }

    /// True when no voice has audio left to play
    pub fn all_voices_idle(&self) -> bool {
        self.fragments.iter().all(|f| !f.is_playing())
    }

    fn fragment_mut(&mut self, id: FragmentId) -> Result<&mut Fragment, SessionError> {
        self.fragments
            .iter_mut()
            .find(|f| f.id() == id)
            .ok_or(SessionError::UnknownFragment(id))
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    // ========== Loading ==========

    /// Load every file independently; a failure never affects the others
    pub fn open_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> OpenReport {
        let mut report = OpenReport::default();

        for path in paths {
            let path = path.as_ref();
            self.status = format!("Loading {} ...", path.display());
            log::info!("{}", self.status);

            match SampleBuffer::load(path) {
                Ok(buffer) => {
                    let id = self.add_buffer(Arc::new(buffer));
                    report.loaded.push(id);
                }
                Err(e) => {
                    log::error!("Failed to load {}: {}", path.display(), e);
                    self.notify(Notification::error(
                        NotificationCategory::Decode,
                        format!("Cannot open {}: {}", path.display(), e),
                    ));
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }

        self.status.clear();
        report
    }

    /// Append a fragment for an already decoded buffer on a fresh track
    pub fn add_buffer(&mut self, buffer: Arc<SampleBuffer>) -> FragmentId {
        let track_y =
            self.config.default_track_y + self.config.track_spacing * self.fragments.len() as f64;
        let fragment = Fragment::new(
            buffer,
            Arc::clone(&self.backend),
            &self.config,
            &self.geometry,
        )
        .with_track_y(track_y);

        let id = fragment.id();
        log::info!(
            "Added fragment {} ({:.3}s) at {:.3}s",
            fragment.label(),
            fragment.duration(),
            fragment.start_time()
        );
        self.fragments.push(fragment);
        id
    }

    // ========== Transport ==========

    /// Start from the cursor, or stop every voice
    pub fn toggle_play(&mut self) {
        if self.transport.is_playing() {
            self.transport.stop();
            for fragment in &self.fragments {
                fragment.stop();
            }
            self.play_line = None;
            log::info!("Transport stopped");
        } else {
            self.transport.start(self.cursor_time);
            self.failing.clear();
            self.play_line = Some(self.geometry.time_to_x(self.cursor_time));
            log::info!("Transport started at {:.3}s", self.cursor_time);
        }
    }

    /// Advance the play line and start every fragment under the playhead
    ///
    /// Voices already playing are left alone. Nothing is stopped here: a fragment
    /// the playhead has passed runs until its samples are exhausted.
    pub fn tick(&mut self) -> TickReport {
        let Some(elapsed) = self.transport.elapsed() else {
            return TickReport::default();
        };
        self.play_line = Some(self.geometry.time_to_x(elapsed));

        let any_solo = self.fragments.iter().any(|f| f.is_solo());
        let mut report = TickReport {
            elapsed: Some(elapsed),
            ..TickReport::default()
        };

        for fragment in &self.fragments {
            if !fragment.contains_time(elapsed) {
                continue;
            }
            fragment.apply_gain(any_solo);
            if fragment.is_playing() {
                continue;
            }

            match fragment.play(elapsed - fragment.start_time()) {
                Ok(()) => {
                    log::debug!(
                        "Triggered {} at {:.3}s (seek {:.3}s)",
                        fragment.label(),
                        elapsed,
                        elapsed - fragment.start_time()
                    );
                    report.triggered.push(fragment.id());
                }
                Err(e) => report.failures.push((fragment.id(), e)),
            }
        }

        for (id, e) in &report.failures {
            if self.failing.insert(*id) {
                log::warn!("Fragment {} could not play: {}", id, e);
                self.notifications.push(Notification::warning(
                    NotificationCategory::Audio,
                    format!("Playback failed: {}", e),
                ));
            }
        }

        report
    }

    // ========== Selection ==========

    /// Select everything, or clear the selection if everything is selected
    pub fn select_all(&mut self) {
        let all_selected = self.fragments.iter().all(|f| f.is_selected());
        for fragment in &mut self.fragments {
            fragment.set_selected(!all_selected);
        }
    }

    pub fn clear_selection(&mut self) {
        for fragment in &mut self.fragments {
            fragment.set_selected(false);
        }
    }

    /// Select one fragment; without `multi` every other fragment is deselected
    pub fn select_fragment(&mut self, id: FragmentId, multi: bool) -> Result<(), SessionError> {
        self.fragment_mut(id)?;
        if !multi {
            self.clear_selection();
        }
        self.fragment_mut(id)?.set_selected(true);
        Ok(())
    }

    /// Stop and remove every selected fragment
    pub fn delete_selected(&mut self) -> Vec<FragmentId> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.fragments)
            .into_iter()
            .partition(|f| f.is_selected());
        self.fragments = kept;

        let ids: Vec<_> = removed.iter().map(|f| f.id()).collect();
        for fragment in removed {
            fragment.stop();
            log::info!("Deleted fragment {}", fragment.label());
        }
        self.released.extend(&ids);
        ids
    }

    /// Rename the selected fragment; ignored unless exactly one is selected
    pub fn rename_selected(&mut self, label: &str) -> bool {
        let mut selected = self.fragments.iter_mut().filter(|f| f.is_selected());
        match (selected.next(), selected.next()) {
            (Some(fragment), None) => {
                fragment.rename(label);
                true
            }
            _ => false,
        }
    }

    /// Resolve a click: buttons act on their fragment, bodies select, the
    /// background clears the selection
    pub fn click(&mut self, x: f64, y: f64, multi: bool) -> ClickTarget {
        let target = self.hit_test(x, y);
        match target {
            ClickTarget::Background => self.clear_selection(),
            ClickTarget::Body(id) => {
                let _ = self.select_fragment(id, multi);
            }
            ClickTarget::Button(id, ButtonKind::Mute) => {
                let _ = self.toggle_mute(id);
            }
            ClickTarget::Button(id, ButtonKind::Solo) => {
                let _ = self.toggle_solo(id);
            }
            ClickTarget::Button(id, ButtonKind::ColorFill) => {
                let _ = self.cycle_color(id);
            }
            ClickTarget::Button(_, ButtonKind::Volume) => {}
        }
        target
    }

    /// Topmost item under the point; later fragments are drawn on top
    pub fn hit_test(&self, x: f64, y: f64) -> ClickTarget {
        for fragment in self.fragments.iter().rev() {
            let layout = fragment.layout(&self.geometry);
            if let Some(kind) = layout.button_at(x, y) {
                return ClickTarget::Button(fragment.id(), kind);
            }
            if layout.body.contains(x, y) {
                return ClickTarget::Body(fragment.id());
            }
        }
        ClickTarget::Background
    }

    // ========== View ==========

    pub fn zoom_in(&mut self) {
        self.geometry.zoom_in();
        self.rescale();
    }

    pub fn zoom_out(&mut self) {
        self.geometry.zoom_out();
        self.rescale();
    }

    pub fn set_pixels_per_second(&mut self, value: f64) -> Result<(), SessionError> {
        self.geometry.set_pixels_per_second(value)?;
        self.rescale();
        Ok(())
    }

    fn rescale(&mut self) {
        for fragment in &mut self.fragments {
            fragment.recompute_waveform_cache(&self.geometry);
        }
        self.refresh_play_line();
        log::debug!("Scale is now {}", self.geometry.scale_label());
    }

    /// Move the start line; fragments and cursor keep their times
    pub fn pan(&mut self, dx: f64) -> Result<(), SessionError> {
        let padding = self.geometry.left_padding() + dx;
        self.geometry.set_left_padding(padding)?;
        self.refresh_play_line();
        Ok(())
    }

    fn refresh_play_line(&mut self) {
        if let Some(elapsed) = self.transport.elapsed() {
            self.play_line = Some(self.geometry.time_to_x(elapsed));
        }
    }

    /// Place the cursor; it never goes left of the start line
    pub fn set_cursor_x(&mut self, x: f64) {
        self.cursor_time = self.geometry.x_to_time(x).max(0.0);
    }

    pub fn set_bpm(&mut self, bpm: u32) -> Result<(), SessionError> {
        let tempo = Tempo::new(bpm)?;
        self.geometry.set_tempo(tempo);
        Ok(())
    }

    // ========== Fragment edits ==========

    pub fn move_selection_vertically(&mut self, dy: f64) {
        for fragment in self.fragments.iter_mut().filter(|f| f.is_selected()) {
            fragment.nudge_vertically(dy);
        }
    }

    /// Place a fragment's start at `start_time` seconds
    pub fn move_fragment(&mut self, id: FragmentId, start_time: f64) -> Result<(), SessionError> {
        self.fragment_mut(id)?.move_to(start_time);
        Ok(())
    }

    pub fn drag_fragment(&mut self, id: FragmentId, x: f64) -> Result<(), SessionError> {
        let geometry = self.geometry.clone();
        self.fragment_mut(id)?.move_to_x(x, &geometry);
        Ok(())
    }

    /// Grow or shrink every fragment's height by `delta`
    pub fn change_track_height(&mut self, delta: f64) {
        for fragment in &mut self.fragments {
            let height = fragment.height() + delta;
            fragment.set_track_height(height, &self.geometry);
        }
    }

    pub fn cycle_color(&mut self, id: FragmentId) -> Result<(), SessionError> {
        self.fragment_mut(id)?.cycle_color();
        Ok(())
    }

    pub fn toggle_mute(&mut self, id: FragmentId) -> Result<(), SessionError> {
        self.fragment_mut(id)?.toggle_mute();
        self.refresh_gains();
        Ok(())
    }

    pub fn toggle_solo(&mut self, id: FragmentId) -> Result<(), SessionError> {
        self.fragment_mut(id)?.toggle_solo();
        self.refresh_gains();
        Ok(())
    }

    pub fn set_volume(&mut self, id: FragmentId, volume: f32) -> Result<(), SessionError> {
        self.fragment_mut(id)?.set_volume(volume);
        self.refresh_gains();
        Ok(())
    }

    /// Mute and solo apply to voices that are already playing
    fn refresh_gains(&self) {
        let any_solo = self.fragments.iter().any(|f| f.is_solo());
        for fragment in &self.fragments {
            fragment.apply_gain(any_solo);
        }
    }

    // ========== Input ==========

    pub fn handle(&mut self, command: Command) -> Result<(), SessionError> {
        log::debug!("Command: {}", command.name());
        let step_height = self.config.track_height_step;
        let nudge = self.config.vertical_nudge;

        match command {
            Command::OpenFiles(paths) => {
                self.open_files(&paths);
            }
            Command::TogglePlay => self.toggle_play(),
            Command::DeleteSelected => {
                self.delete_selected();
            }
            Command::SelectAll => self.select_all(),
            Command::ClearSelection => self.clear_selection(),
            Command::SelectFragment { id, multi } => self.select_fragment(id, multi)?,
            Command::Click { x, y, multi } => {
                self.click(x, y, multi);
            }
            Command::RenameSelected(label) => {
                self.rename_selected(&label);
            }
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),
            Command::Pan(dx) => self.pan(dx)?,
            Command::SetCursorX(x) => self.set_cursor_x(x),
            Command::SetBpm(bpm) => self.set_bpm(bpm)?,
            Command::MoveSelectionUp => self.move_selection_vertically(-nudge),
            Command::MoveSelectionDown => self.move_selection_vertically(nudge),
            Command::DragFragment { id, x } => self.drag_fragment(id, x)?,
            Command::TrackHeightUp => self.change_track_height(step_height),
            Command::TrackHeightDown => self.change_track_height(-step_height),
            Command::CycleColor(id) => self.cycle_color(id)?,
            Command::ToggleMute(id) => self.toggle_mute(id)?,
            Command::ToggleSolo(id) => self.toggle_solo(id)?,
            Command::SetVolume { id, volume } => self.set_volume(id, volume)?,
            Command::Shutdown => self.shutdown(),
        }
        Ok(())
    }

    // ========== Teardown ==========

    /// Stop the transport and every voice
    pub fn shutdown(&mut self) {
        if self.transport.is_playing() {
            self.transport.stop();
            self.play_line = None;
        }
        for fragment in &self.fragments {
            fragment.stop();
        }
        log::info!("Session shut down ({} fragments)", self.fragments.len());
    }

    /// Wait for every voice thread to finish
    pub fn wait_for_voices(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.fragments.iter().all(|f| {
            let left = deadline.saturating_duration_since(Instant::now());
            f.voice().wait_until_stopped(left)
        })
    }
}

impl<C: Clock> Drop for Session<C> {
    fn drop(&mut self) {
        for fragment in &self.fragments {
            fragment.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::MemoryBackend;
    use crate::timeline::ManualClock;

    const WAIT: Duration = Duration::from_secs(5);

    fn session_with(backend: &MemoryBackend) -> Session<ManualClock> {
        Session::with_clock(
            SequencerConfig::default(),
            Arc::new(backend.clone()),
            ManualClock::new(),
        )
        .unwrap()
    }

    /// `seconds` of a constant level at 1 kHz mono
    fn tone(seconds: f64, level: i16) -> Arc<SampleBuffer> {
        let frames = (seconds * 1000.0) as usize;
        Arc::new(SampleBuffer::from_samples(vec![level; frames], 1000, 1).with_name("TONE"))
    }

    #[test]
    fn test_fragments_stack_on_new_tracks() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        session.add_buffer(tone(1.0, 1));
        session.add_buffer(tone(1.0, 1));

        let ys: Vec<_> = session.fragments().iter().map(|f| f.track_y()).collect();
        assert_eq!(ys, vec![25.0, 65.0]);
        assert!(session.fragments().iter().all(|f| f.start_time() == 1.0));
    }

    #[test]
    fn test_open_missing_file_reports_and_continues() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);

        let report = session.open_files(&["/definitely/not/here.wav"]);
        assert!(report.loaded.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(session.fragments().is_empty());
        assert_eq!(session.notifications().errors().count(), 1);
        assert_eq!(session.status(), "");
    }

    #[test]
    fn test_tick_triggers_fragment_in_interval() {
        let backend = MemoryBackend::paced(Duration::from_millis(2));
        let mut session = session_with(&backend);
        let id = session.add_buffer(tone(2.0, 100));

        session.toggle_play();
        assert!(session.is_playing());
        assert_eq!(session.play_line(), Some(200.0));

        let report = session.tick();
        assert_eq!(report.elapsed, Some(0.0));
        assert!(report.triggered.is_empty());

        session.clock().advance_secs(1.5);
        let report = session.tick();
        assert_eq!(report.triggered, vec![id]);
        assert_eq!(session.play_line(), Some(215.0));
        assert!(session.fragment(id).unwrap().is_playing());

        // Already playing: not triggered again
        session.clock().advance_secs(0.1);
        assert!(session.tick().triggered.is_empty());
        assert_eq!(backend.open_count(), 1);

        session.toggle_play();
        assert_eq!(session.play_line(), None);
        assert!(session.wait_for_voices(WAIT));
        assert!(session.all_voices_idle());
    }

    #[test]
    fn test_tick_seeks_into_fragment() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        session.add_buffer(Arc::new(
            SampleBuffer::from_samples((0..2000).map(|i| i as i16).collect(), 1000, 1),
        ));

        session.toggle_play();
        session.clock().advance_secs(1.5);
        session.tick();
        assert!(session.wait_for_voices(WAIT));

        let written = backend.written(0);
        assert_eq!(written.first(), Some(&500));
        assert_eq!(written.len(), 1500);
    }

    #[test]
    fn test_transport_starts_from_cursor() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        session.set_cursor_x(230.0);
        assert_eq!(session.cursor_time(), 3.0);

        session.toggle_play();
        assert_eq!(session.tick().elapsed, Some(3.0));
        assert_eq!(session.play_position_label(), "0min 3.000sec");
    }

    #[test]
    fn test_cursor_clamped_to_start_line() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        session.set_cursor_x(50.0);
        assert_eq!(session.cursor_time(), 0.0);
        assert_eq!(session.cursor_x(), 200.0);
    }

    #[test]
    fn test_muted_fragment_plays_silently() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        let loud = session.add_buffer(tone(0.5, 1000));
        let soloed = session.add_buffer(tone(0.5, 1000));
        session.toggle_solo(soloed).unwrap();

        session.toggle_play();
        session.clock().advance_secs(1.0);
        let report = session.tick();
        assert_eq!(report.triggered, vec![loud, soloed]);
        assert!(session.wait_for_voices(WAIT));

        assert!(backend.written(0).iter().all(|&s| s == 0));
        assert!(backend.written(1).iter().all(|&s| s == 1000));
    }

    #[test]
    fn test_device_failure_is_reported_once() {
        let backend = MemoryBackend::new();
        backend.set_available(false);
        let mut session = session_with(&backend);
        let id = session.add_buffer(tone(2.0, 1));

        session.toggle_play();
        session.clock().advance_secs(1.0);
        let report = session.tick();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, id);

        session.clock().advance_secs(0.01);
        assert_eq!(session.tick().failures.len(), 1);
        assert_eq!(session.notifications().len(), 1);
        assert!(!session.fragment(id).unwrap().is_playing());
    }

    #[test]
    fn test_delete_selected_stops_and_releases() {
        let backend = MemoryBackend::paced(Duration::from_millis(2));
        let mut session = session_with(&backend);
        let keep = session.add_buffer(tone(5.0, 1));
        let doomed = session.add_buffer(tone(5.0, 1));
        session.fragment(doomed).unwrap().play(0.0).unwrap();

        session.select_fragment(doomed, false).unwrap();
        assert_eq!(session.delete_selected(), vec![doomed]);

        assert!(session.fragment(doomed).is_none());
        assert!(session.fragment(keep).is_some());
        assert_eq!(session.take_released(), vec![doomed]);
        assert!(session.take_released().is_empty());

        let deadline = Instant::now() + WAIT;
        while backend.closed_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(backend.closed_count(), 1);
    }

    #[test]
    fn test_selection_rules() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        let a = session.add_buffer(tone(1.0, 1));
        let b = session.add_buffer(tone(1.0, 1));

        session.select_fragment(a, false).unwrap();
        session.select_fragment(b, false).unwrap();
        assert_eq!(session.selected_ids(), vec![b]);

        session.select_fragment(a, true).unwrap();
        assert_eq!(session.selected_ids(), vec![a, b]);

        session.select_all();
        assert!(session.selected_ids().is_empty());
        session.select_all();
        assert_eq!(session.selected_ids(), vec![a, b]);

        assert!(matches!(
            session.select_fragment(FragmentId::new(), false),
            Err(SessionError::UnknownFragment(_))
        ));
    }

    #[test]
    fn test_rename_requires_single_selection() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        let a = session.add_buffer(tone(1.0, 1));
        session.add_buffer(tone(1.0, 1));

        assert!(!session.rename_selected("NOPE"));
        session.select_all();
        assert!(!session.rename_selected("NOPE"));

        session.select_fragment(a, false).unwrap();
        assert!(session.rename_selected("LEAD"));
        assert_eq!(session.fragment(a).unwrap().label(), "LEAD");
    }

    #[test]
    fn test_zoom_rebuilds_every_cache() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        session.add_buffer(tone(10.0, 500));
        session.add_buffer(tone(3.0, -500));
        session.set_cursor_x(250.0);

        let before: Vec<_> = session
            .fragments()
            .iter()
            .map(|f| f.waveform_cache().clone())
            .collect();
        session.zoom_in();
        assert_eq!(session.geometry().pixels_per_second(), 11.0);

        for (fragment, old) in session.fragments().iter().zip(&before) {
            assert_ne!(fragment.waveform_cache(), old);
        }
        assert_eq!(session.cursor_time(), 5.0);
        assert_eq!(session.cursor_x(), 255.0);
    }

    #[test]
    fn test_pan_keeps_times() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        let id = session.add_buffer(tone(1.0, 1));
        session.set_cursor_x(220.0);

        session.pan(-50.0).unwrap();
        assert_eq!(session.geometry().left_padding(), 150.0);
        assert_eq!(session.cursor_time(), 2.0);
        assert_eq!(session.cursor_x(), 170.0);
        let fragment = session.fragment(id).unwrap();
        assert_eq!(fragment.start_time(), 1.0);
        assert_eq!(fragment.x(session.geometry()), 160.0);

        assert!(matches!(
            session.handle(Command::Pan(f64::NAN)),
            Err(SessionError::Geometry(GeometryError::NonFinite(_)))
        ));
        assert_eq!(session.geometry().left_padding(), 150.0);
    }

    #[test]
    fn test_bpm_outside_range_is_rejected() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);

        assert!(matches!(
            session.set_bpm(u32::MAX),
            Err(SessionError::Geometry(GeometryError::TempoOutOfRange(_)))
        ));
        assert!(session.set_bpm(0).is_err());
        assert_eq!(session.geometry().tempo().bpm(), 110);

        session.set_bpm(999).unwrap();
        assert_eq!(session.geometry().tempo().bpm(), 999);
    }

    #[test]
    fn test_handle_commands() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        let id = session.add_buffer(tone(1.0, 1));

        session.handle(Command::SelectFragment { id, multi: false }).unwrap();
        session.handle(Command::MoveSelectionUp).unwrap();
        assert_eq!(session.fragment(id).unwrap().track_y(), 20.0);

        session.handle(Command::TrackHeightDown).unwrap();
        session.handle(Command::TrackHeightDown).unwrap();
        assert_eq!(session.fragment(id).unwrap().height(), 15.0);
        for _ in 0..10 {
            session.handle(Command::TrackHeightDown).unwrap();
        }
        assert_eq!(session.fragment(id).unwrap().height(), 5.0);

        session.handle(Command::DragFragment { id, x: 300.0 }).unwrap();
        assert_eq!(session.fragment(id).unwrap().start_time(), 10.0);
        session.move_fragment(id, 2.5).unwrap();
        assert_eq!(session.fragment(id).unwrap().start_time(), 2.5);

        session.handle(Command::SetBpm(120)).unwrap();
        assert!(session.handle(Command::SetBpm(0)).is_err());
        assert_eq!(session.geometry().tempo().bpm(), 120);

        session.handle(Command::SetVolume { id, volume: 0.25 }).unwrap();
        assert_eq!(session.fragment(id).unwrap().voice().gain(), 0.25);

        assert!(matches!(
            session.handle(Command::ToggleMute(FragmentId::new())),
            Err(SessionError::UnknownFragment(_))
        ));
    }

    #[test]
    fn test_click_dispatch() {
        let backend = MemoryBackend::new();
        let mut session = session_with(&backend);
        let id = session.add_buffer(tone(10.0, 1));

        // Body of a fragment at x = 210, y = 25
        assert_eq!(session.click(250.0, 30.0, false), ClickTarget::Body(id));
        assert!(session.fragment(id).unwrap().is_selected());

        assert_eq!(
            session.click(215.0, 10.0, false),
            ClickTarget::Button(id, ButtonKind::Mute)
        );
        assert!(session.fragment(id).unwrap().is_muted());

        assert_eq!(session.click(10.0, 400.0, false), ClickTarget::Background);
        assert!(session.selected_ids().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SequencerConfig {
            pixels_per_second: -1.0,
            ..SequencerConfig::default()
        };
        let result = Session::with_clock(config, Arc::new(MemoryBackend::new()), ManualClock::new());
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
