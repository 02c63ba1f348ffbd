// Fragment layout - Screen rectangles of a fragment and its buttons
//
// A fragment draws as a body rectangle with a row of square buttons sitting on its
// top edge, a track label after the buttons and, when selected, a dashed mark
// around everything. Button positions are fixed column offsets from the body's x.

use crate::config::SequencerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Mute,
    Solo,
    ColorFill,
    Volume,
}

/// Where a button sits in the row, in button widths from the body's left edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonSlot {
    pub kind: ButtonKind,
    pub column: f64,
    pub caption: Option<&'static str>,
}

pub const BUTTON_SLOTS: [ButtonSlot; 4] = [
    ButtonSlot {
        kind: ButtonKind::Mute,
        column: 0.0,
        caption: Some("M"),
    },
    ButtonSlot {
        kind: ButtonKind::Solo,
        column: 1.0,
        caption: Some("S"),
    },
    ButtonSlot {
        kind: ButtonKind::ColorFill,
        column: 2.0,
        caption: None,
    },
    ButtonSlot {
        kind: ButtonKind::Volume,
        column: 3.0,
        caption: None,
    },
];

/// Column the track label starts at, plus a small gap
const LABEL_COLUMN: f64 = 4.0;
const LABEL_GAP: f64 = 5.0;

/// Sizes shared by every fragment layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub button_size: f64,
    pub selection_padding: f64,
}

impl LayoutMetrics {
    pub fn from_config(config: &SequencerConfig) -> Self {
        Self {
            button_size: config.button_size,
            selection_padding: config.selection_padding,
        }
    }
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            button_size: 25.0,
            selection_padding: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonLayout {
    pub kind: ButtonKind,
    pub rect: Rect,
    pub text: String,
    /// Toggle buttons draw filled when active
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextAnchor {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Everything needed to draw one fragment, in absolute canvas coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentLayout {
    pub body: Rect,
    pub buttons: [ButtonLayout; 4],
    /// Left-anchored, vertically centred on the button row
    pub label: TextAnchor,
    pub selection_mark: Option<Rect>,
    pub waveform: Vec<(f64, f64)>,
}

/// Per-fragment values the layout depends on
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub mute: bool,
    pub solo: bool,
    pub selected: bool,
    pub volume: f32,
    pub label: &'a str,
}

impl FragmentLayout {
    pub fn compute(input: LayoutInput<'_>, metrics: LayoutMetrics, waveform: Vec<(f64, f64)>) -> Self {
        let size = metrics.button_size;
        let row_y = input.y - size;

        let buttons = BUTTON_SLOTS.map(|slot| {
            let (text, active) = match slot.kind {
                ButtonKind::Mute => (slot.caption.unwrap_or_default().to_string(), input.mute),
                ButtonKind::Solo => (slot.caption.unwrap_or_default().to_string(), input.solo),
                ButtonKind::ColorFill => (String::new(), true),
                ButtonKind::Volume => (format!("{:.1}", input.volume), true),
            };
            ButtonLayout {
                kind: slot.kind,
                rect: Rect::new(input.x + size * slot.column, row_y, size, size),
                text,
                active,
            }
        });

        let selection_mark = input.selected.then(|| {
            let pad = metrics.selection_padding;
            Rect::new(
                input.x - pad,
                row_y - pad,
                input.width + pad * 2.0,
                input.height + pad * 2.0 + size,
            )
        });

        Self {
            body: Rect::new(input.x, input.y, input.width, input.height),
            buttons,
            label: TextAnchor {
                x: input.x + size * LABEL_COLUMN + LABEL_GAP,
                y: input.y - size / 2.0,
                text: input.label.to_string(),
            },
            selection_mark,
            waveform,
        }
    }

    pub fn button(&self, kind: ButtonKind) -> &ButtonLayout {
        let index = BUTTON_SLOTS
            .iter()
            .position(|slot| slot.kind == kind)
            .unwrap_or_default();
        &self.buttons[index]
    }

    /// Button under the point, if any
    pub fn button_at(&self, x: f64, y: f64) -> Option<ButtonKind> {
        self.buttons
            .iter()
            .find(|b| b.rect.contains(x, y))
            .map(|b| b.kind)
    }
}
