// Render - Scene description pushed to a drawing surface
//
// The session never draws. `SceneRenderer` walks it and issues retained-mode
// operations against a `DrawingSurface`, one stable handle per on-screen element,
// so a surface can update items in place instead of redrawing everything.

use std::collections::HashMap;

use crate::fragment::{ButtonKind, Fragment, FragmentId, Rect};
use crate::session::Session;
use crate::timeline::Clock;

const GRID_COLOR: &str = "#444";
const BEAT_LINE_COLOR: &str = "#555555";
const START_LINE_COLOR: &str = "#674172";
const CURSOR_COLOR: &str = "#3498db";
const PLAY_LINE_COLOR: &str = "#2ecc71";
const LABEL_COLOR: &str = "#999";
const TRACK_LABEL_COLOR: &str = "#aaa";
const WAVEFORM_COLOR: &str = "#000";
const INACTIVE_FILL: &str = "#000";
const SELECT_COLOR: &str = "#1e90ff";
const SELECT_LINE_WIDTH: f64 = 3.0;
const DASH: f64 = 5.0;
const LABEL_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentPart {
    Body,
    Button(ButtonKind),
    ButtonText(ButtonKind),
    Waveform,
    Label,
    SelectionMark,
}

impl FragmentPart {
    pub const ALL: [FragmentPart; 12] = [
        FragmentPart::Body,
        FragmentPart::Button(ButtonKind::Mute),
        FragmentPart::Button(ButtonKind::Solo),
        FragmentPart::Button(ButtonKind::ColorFill),
        FragmentPart::Button(ButtonKind::Volume),
        FragmentPart::ButtonText(ButtonKind::Mute),
        FragmentPart::ButtonText(ButtonKind::Solo),
        FragmentPart::ButtonText(ButtonKind::ColorFill),
        FragmentPart::ButtonText(ButtonKind::Volume),
        FragmentPart::Waveform,
        FragmentPart::Label,
        FragmentPart::SelectionMark,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Scale,
    Tempo,
    Status,
    PlayPosition,
}

/// Identity of one drawn element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawHandle {
    TrackGridRow(usize),
    TrackGridColumn(usize),
    BeatLine(usize),
    StartLine,
    CursorLine,
    PlayLine,
    Fragment(FragmentId, FragmentPart),
    Label(LabelKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Style {
    pub fill: Option<&'static str>,
    pub outline: Option<&'static str>,
    pub width: f64,
    /// Dash length, solid when `None`
    pub dash: Option<f64>,
}

impl Style {
    pub fn stroke(color: &'static str, width: f64) -> Self {
        Self {
            fill: None,
            outline: Some(color),
            width,
            dash: None,
        }
    }

    pub fn filled(fill: &'static str, outline: &'static str) -> Self {
        Self {
            fill: Some(fill),
            outline: Some(outline),
            width: 1.0,
            dash: None,
        }
    }

    pub fn text(color: &'static str) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn dashed(mut self, dash: f64) -> Self {
        self.dash = Some(dash);
        self
    }
}

/// Retained-mode drawing backend
///
/// Each call creates the element behind `handle` or replaces it; `hide` removes it
/// from view until it is drawn again.
pub trait DrawingSurface {
    fn rectangle(&mut self, handle: DrawHandle, rect: Rect, style: Style);
    fn line(&mut self, handle: DrawHandle, points: &[(f64, f64)], style: Style);
    fn text(&mut self, handle: DrawHandle, x: f64, y: f64, text: &str, style: Style);
    fn hide(&mut self, handle: DrawHandle);
}

/// Size of the drawing area in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Draws a session, remembering how many grid lines the last frame used so that
/// lines no longer needed get hidden
#[derive(Debug, Default)]
pub struct SceneRenderer {
    grid_rows: usize,
    grid_columns: usize,
    beat_lines: usize,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render<C: Clock>(
        &mut self,
        session: &mut Session<C>,
        canvas: Canvas,
        surface: &mut dyn DrawingSurface,
    ) {
        for id in session.take_released() {
            for part in FragmentPart::ALL {
                surface.hide(DrawHandle::Fragment(id, part));
            }
        }

        self.draw_track_grid(session.config().track_spacing, canvas, surface);
        self.draw_beat_lines(session, canvas, surface);
        draw_timeline_lines(session, canvas, surface);
        for fragment in session.fragments() {
            draw_fragment(fragment, session, surface);
        }
        draw_labels(session, canvas, surface);
    }

    fn draw_track_grid(&mut self, spacing: f64, canvas: Canvas, surface: &mut dyn DrawingSurface) {
        let style = Style::stroke(GRID_COLOR, 1.0).dashed(DASH);
        let positions = |limit: f64| -> Vec<f64> {
            if spacing <= 0.0 {
                return Vec::new();
            }
            (0..)
                .map(|i| i as f64 * spacing)
                .take_while(|&p| p < limit)
                .collect()
        };

        let rows = positions(canvas.height);
        for (i, &y) in rows.iter().enumerate() {
            surface.line(DrawHandle::TrackGridRow(i), &[(0.0, y), (canvas.width, y)], style);
        }
        for i in rows.len()..self.grid_rows {
            surface.hide(DrawHandle::TrackGridRow(i));
        }
        self.grid_rows = rows.len();

        let columns = positions(canvas.width);
        for (i, &x) in columns.iter().enumerate() {
            surface.line(DrawHandle::TrackGridColumn(i), &[(x, 0.0), (x, canvas.height)], style);
        }
        for i in columns.len()..self.grid_columns {
            surface.hide(DrawHandle::TrackGridColumn(i));
        }
        self.grid_columns = columns.len();
    }

    fn draw_beat_lines<C: Clock>(
        &mut self,
        session: &Session<C>,
        canvas: Canvas,
        surface: &mut dyn DrawingSurface,
    ) {
        let style = Style::stroke(BEAT_LINE_COLOR, 1.0);
        let lines = session.geometry().bpm_grid_lines(canvas.width);
        for (i, &x) in lines.iter().enumerate() {
            surface.line(DrawHandle::BeatLine(i), &[(x, 0.0), (x, canvas.height)], style);
        }
        for i in lines.len()..self.beat_lines {
            surface.hide(DrawHandle::BeatLine(i));
        }
        self.beat_lines = lines.len();
    }
}

/// One-shot render with a fresh [`SceneRenderer`]
pub fn render_scene<C: Clock>(
    session: &mut Session<C>,
    canvas: Canvas,
    surface: &mut dyn DrawingSurface,
) {
    SceneRenderer::new().render(session, canvas, surface);
}

fn vertical(x: f64, canvas: Canvas) -> [(f64, f64); 2] {
    [(x, 0.0), (x, canvas.height)]
}

fn draw_timeline_lines<C: Clock>(session: &Session<C>, canvas: Canvas, surface: &mut dyn DrawingSurface) {
    let geometry = session.geometry();
    surface.line(
        DrawHandle::StartLine,
        &vertical(geometry.left_padding(), canvas),
        Style::stroke(START_LINE_COLOR, 2.0),
    );
    surface.line(
        DrawHandle::CursorLine,
        &vertical(session.cursor_x(), canvas),
        Style::stroke(CURSOR_COLOR, 3.0),
    );
    match session.play_line() {
        Some(x) => surface.line(
            DrawHandle::PlayLine,
            &vertical(x, canvas),
            Style::stroke(PLAY_LINE_COLOR, 1.0),
        ),
        None => surface.hide(DrawHandle::PlayLine),
    }
}

fn draw_fragment<C: Clock>(
    fragment: &Fragment,
    session: &Session<C>,
    surface: &mut dyn DrawingSurface,
) {
    let id = fragment.id();
    let color = fragment.color().hex();
    let layout = fragment.layout(session.geometry());
    let handle = |part| DrawHandle::Fragment(id, part);

    surface.rectangle(handle(FragmentPart::Body), layout.body, Style::filled(color, color));

    for button in &layout.buttons {
        let (fill, text_color) = if button.active {
            (color, INACTIVE_FILL)
        } else {
            (INACTIVE_FILL, color)
        };
        surface.rectangle(
            handle(FragmentPart::Button(button.kind)),
            button.rect,
            Style::filled(fill, color),
        );

        let text_handle = handle(FragmentPart::ButtonText(button.kind));
        if button.text.is_empty() {
            surface.hide(text_handle);
        } else {
            let (cx, cy) = button.rect.center();
            surface.text(text_handle, cx, cy, &button.text, Style::text(text_color));
        }
    }

    surface.line(
        handle(FragmentPart::Waveform),
        &layout.waveform,
        Style::stroke(WAVEFORM_COLOR, 3.0),
    );
    surface.text(
        handle(FragmentPart::Label),
        layout.label.x,
        layout.label.y,
        &layout.label.text,
        Style::text(TRACK_LABEL_COLOR),
    );

    match layout.selection_mark {
        Some(mark) => surface.rectangle(
            handle(FragmentPart::SelectionMark),
            mark,
            Style::stroke(SELECT_COLOR, SELECT_LINE_WIDTH).dashed(DASH),
        ),
        None => surface.hide(handle(FragmentPart::SelectionMark)),
    }
}

fn draw_labels<C: Clock>(session: &Session<C>, canvas: Canvas, surface: &mut dyn DrawingSurface) {
    let style = Style::text(LABEL_COLOR);
    let right = canvas.width - LABEL_MARGIN;
    let bottom = canvas.height - LABEL_MARGIN;

    surface.text(
        DrawHandle::Label(LabelKind::Scale),
        right,
        bottom,
        &session.geometry().scale_label(),
        style,
    );
    surface.text(
        DrawHandle::Label(LabelKind::Tempo),
        right,
        bottom - LABEL_MARGIN,
        &session.geometry().tempo().to_string(),
        style,
    );
    surface.text(
        DrawHandle::Label(LabelKind::Status),
        LABEL_MARGIN,
        bottom,
        session.status(),
        style,
    );
    surface.text(
        DrawHandle::Label(LabelKind::PlayPosition),
        LABEL_MARGIN,
        LABEL_MARGIN,
        &session.play_position_label(),
        style,
    );
}

/// Last operation applied to an element
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rectangle { rect: Rect, style: Style },
    Line { points: Vec<(f64, f64)>, style: Style },
    Text { x: f64, y: f64, text: String, style: Style },
    Hidden,
}

/// In-memory surface keeping the latest operation per handle
#[derive(Debug, Default)]
pub struct RecordingSurface {
    elements: HashMap<DrawHandle, DrawOp>,
    operations: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: DrawHandle) -> Option<&DrawOp> {
        self.elements.get(&handle)
    }

    pub fn is_visible(&self, handle: DrawHandle) -> bool {
        matches!(self.get(handle), Some(op) if *op != DrawOp::Hidden)
    }

    /// Handles currently shown as rectangles
    pub fn rectangles(&self) -> impl Iterator<Item = (&DrawHandle, &Rect)> {
        self.elements.iter().filter_map(|(handle, op)| match op {
            DrawOp::Rectangle { rect, .. } => Some((handle, rect)),
            _ => None,
        })
    }

    /// Text of a label, if drawn
    pub fn text_of(&self, handle: DrawHandle) -> Option<&str> {
        match self.get(handle) {
            Some(DrawOp::Text { text, .. }) => Some(text),
            _ => None,
        }
    }

    pub fn operation_count(&self) -> usize {
        self.operations
    }

    fn record(&mut self, handle: DrawHandle, op: DrawOp) {
        self.operations += 1;
        self.elements.insert(handle, op);
    }
}

impl DrawingSurface for RecordingSurface {
    fn rectangle(&mut self, handle: DrawHandle, rect: Rect, style: Style) {
        self.record(handle, DrawOp::Rectangle { rect, style });
    }

    fn line(&mut self, handle: DrawHandle, points: &[(f64, f64)], style: Style) {
        self.record(
            handle,
            DrawOp::Line {
                points: points.to_vec(),
                style,
            },
        );
    }

    fn text(&mut self, handle: DrawHandle, x: f64, y: f64, text: &str, style: Style) {
        self.record(
            handle,
            DrawOp::Text {
                x,
                y,
                text: text.to_string(),
                style,
            },
        );
    }

    fn hide(&mut self, handle: DrawHandle) {
        self.record(handle, DrawOp::Hidden);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::MemoryBackend;
    use crate::config::SequencerConfig;
    use crate::timeline::ManualClock;
    use crate::waveform::SampleBuffer;
    use std::sync::Arc;

    fn session() -> Session<ManualClock> {
        Session::with_clock(
            SequencerConfig::default(),
            Arc::new(MemoryBackend::new()),
            ManualClock::new(),
        )
        .unwrap()
    }

    fn buffer() -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::from_samples(vec![0; 1000], 100, 1).with_name("KICK"))
    }

    #[test]
    fn test_one_body_per_fragment() {
        let mut session = session();
        let a = session.add_buffer(buffer());
        let b = session.add_buffer(buffer());

        let mut surface = RecordingSurface::new();
        render_scene(&mut session, Canvas::new(800.0, 600.0), &mut surface);

        let bodies: Vec<_> = surface
            .rectangles()
            .filter(|(h, _)| matches!(h, DrawHandle::Fragment(_, FragmentPart::Body)))
            .collect();
        assert_eq!(bodies.len(), 2);
        assert_eq!(
            surface.get(DrawHandle::Fragment(a, FragmentPart::Body)),
            Some(&DrawOp::Rectangle {
                rect: Rect::new(210.0, 25.0, 100.0, 25.0),
                style: Style::filled("#00aacc", "#00aacc"),
            })
        );
        assert!(surface.is_visible(DrawHandle::Fragment(b, FragmentPart::Waveform)));
        assert!(!surface.is_visible(DrawHandle::Fragment(b, FragmentPart::SelectionMark)));
    }

    #[test]
    fn test_released_fragments_are_hidden() {
        let mut session = session();
        let id = session.add_buffer(buffer());
        let mut renderer = SceneRenderer::new();
        let mut surface = RecordingSurface::new();
        renderer.render(&mut session, Canvas::new(800.0, 600.0), &mut surface);

        session.select_all();
        session.delete_selected();
        renderer.render(&mut session, Canvas::new(800.0, 600.0), &mut surface);

        for part in FragmentPart::ALL {
            assert_eq!(surface.get(DrawHandle::Fragment(id, part)), Some(&DrawOp::Hidden));
        }
    }

    #[test]
    fn test_play_line_hidden_when_stopped() {
        let mut session = session();
        let mut surface = RecordingSurface::new();
        render_scene(&mut session, Canvas::new(800.0, 600.0), &mut surface);
        assert_eq!(surface.get(DrawHandle::PlayLine), Some(&DrawOp::Hidden));

        session.toggle_play();
        render_scene(&mut session, Canvas::new(800.0, 600.0), &mut surface);
        assert!(surface.is_visible(DrawHandle::PlayLine));
    }

    #[test]
    fn test_labels() {
        let mut session = session();
        let mut surface = RecordingSurface::new();
        render_scene(&mut session, Canvas::new(800.0, 600.0), &mut surface);

        assert_eq!(surface.text_of(DrawHandle::Label(LabelKind::Scale)), Some("10px/sec"));
        assert_eq!(surface.text_of(DrawHandle::Label(LabelKind::Tempo)), Some("110 BPM"));
        assert_eq!(surface.text_of(DrawHandle::Label(LabelKind::Status)), Some(""));
        assert_eq!(
            surface.text_of(DrawHandle::Label(LabelKind::PlayPosition)),
            Some("0min 0.000sec")
        );
    }

    #[test]
    fn test_stale_grid_lines_hidden_after_resize() {
        let mut session = session();
        let mut renderer = SceneRenderer::new();
        let mut surface = RecordingSurface::new();

        renderer.render(&mut session, Canvas::new(800.0, 600.0), &mut surface);
        assert!(surface.is_visible(DrawHandle::TrackGridRow(14)));
        assert!(surface.is_visible(DrawHandle::BeatLine(50)));

        renderer.render(&mut session, Canvas::new(300.0, 100.0), &mut surface);
        assert!(surface.is_visible(DrawHandle::TrackGridRow(2)));
        assert_eq!(surface.get(DrawHandle::TrackGridRow(3)), Some(&DrawOp::Hidden));
        assert!(surface.is_visible(DrawHandle::BeatLine(10)));
        assert_eq!(surface.get(DrawHandle::BeatLine(50)), Some(&DrawOp::Hidden));
    }

    #[test]
    fn test_grid_is_dashed() {
        let mut session = session();
        let mut surface = RecordingSurface::new();
        render_scene(&mut session, Canvas::new(100.0, 100.0), &mut surface);

        match surface.get(DrawHandle::TrackGridColumn(1)) {
            Some(DrawOp::Line { points, style }) => {
                assert_eq!(points, &vec![(40.0, 0.0), (40.0, 100.0)]);
                assert_eq!(style.dash, Some(5.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
